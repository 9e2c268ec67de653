use std::sync::LazyLock;

use crate::logger::Logger;
use crate::sync::constants::SYNC_LOGGER_NAME;

pub static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new(SYNC_LOGGER_NAME));
