//! Logging macros.
//! With the `defmt` feature enabled they forward to `defmt`, otherwise they vanish. The
//! arguments are still borrowed in the disabled case so that values only used for logging
//! do not trigger unused warnings.
#![allow(unused_macros)]

macro_rules! log {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($($tt:tt)*) => { log!(debug, $($tt)*) };
}

macro_rules! info {
    ($($tt:tt)*) => { log!(info, $($tt)*) };
}

macro_rules! warn {
    ($($tt:tt)*) => { log!(warn, $($tt)*) };
}

macro_rules! error {
    ($($tt:tt)*) => { log!(error, $($tt)*) };
}
