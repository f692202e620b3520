use crate::severity::LogSeverity;
use crate::systime::now;
use once_cell::sync::OnceCell;

static MIN_SEVERITY: OnceCell<LogSeverity> = OnceCell::new();

/// Sets the lowest severity that gets printed. Only the first call has an effect.
pub fn init(min_severity: LogSeverity) -> bool {
    MIN_SEVERITY.set(min_severity).is_ok()
}

/// Returns true if a message of this severity would be printed.
pub fn enabled(log_severity: LogSeverity) -> bool {
    log_severity >= *MIN_SEVERITY.get().unwrap_or(&LogSeverity::Info)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if !enabled(log_severity) {
        return;
    }
    match log_severity {
        LogSeverity::Error | LogSeverity::Fatal => {
            eprintln!("[{}] {} {}", log_severity, now(), msg)
        }
        _ => println!("[{}] {} {}", log_severity, now(), msg),
    }
}
