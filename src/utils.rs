// Logging shims. They expand to `tracing` events with the `tracing` feature and to nothing
// otherwise, so hot retry loops pay nothing in default builds.

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}

macro_rules! info {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!($($arg)*);
    };
}
