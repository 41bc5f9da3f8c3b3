//! Tree configuration.

/// Configuration for a [`RadixTree`](crate::RadixTree).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Run the destroy callback on every remaining value when the tree is
    /// cleared or dropped. Off by default: only `remove` hands values to
    /// the callback, and bulk teardown just drops them.
    pub destroy_on_clear: bool,
}
