use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::pipeline::{SortKey, StatusSet};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.sort_by.as_deref() {
        if SortKey::parse(raw).is_none() {
            return Err(format!("invalid --sort-by '{raw}', expected rep, sr or new"));
        }
    }
    if let Some(raw) = args.status.as_deref() {
        if StatusSet::is_blank_list(raw) {
            return Err(format!("invalid --status '{raw}': status list is empty"));
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json or html"
            ));
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if args.interactive && args.output.is_none() && args.output_format.is_some() {
        return Err("--output-format in interactive mode requires --output".to_string());
    }
    Ok(())
}
