use std::sync::LazyLock;

use crate::logger::Logger;

pub static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("Keen IO"));

pub(crate) fn usage_hint() {
    LOGGER.info(format!(
        "Check out the usage guide: {}",
        crate::tracker::constants::USAGE_GUIDE_URL
    ));
}
