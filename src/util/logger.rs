use std::fmt::{Debug, Display, Formatter};

use crate::util::Code;

use super::Log;

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl<T> Log<T> {
    /// Order of the log level; higher values are more verbose.
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<TL: Display> Log<TL> {
    /// Trace a successful scan/parse step at a source position, gated by level.
    pub fn trace_success<T: Debug>(&self, pointer: usize, value: &T, code: &Code) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Success(()).order() {
            println!(
                "[{}; success]: {:?} at {}",
                self,
                value,
                code.obtain_position(pointer)
            );
        }
    }

    /// Trace a failed scan/parse step at a source position, gated by level.
    pub fn trace_failure(&self, pointer: usize, code: &Code) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Result(()).order() {
            println!("[{}; failure]: at {}", self, code.obtain_position(pointer));
        }
    }
}
