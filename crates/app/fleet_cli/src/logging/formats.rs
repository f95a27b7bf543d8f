use flexi_logger::{DeferredNow, style};
use log::{Level, Record};

/// Bare message for info, coloured level prefix for everything else.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    if level == Level::Info {
        write!(w, "{}", record.args())
    } else {
        write!(
            w,
            "{} {}",
            style(level).paint(level.as_str().to_lowercase()),
            record.args()
        )
    }
}
