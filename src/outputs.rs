//! Stack outputs and the CI output channel.

use crate::error::DeployResult;
use crate::provider::StackProvider;
use crate::stack::get_stack;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Key/value outputs of a stack. Entries missing either half are skipped;
/// a stack that cannot be found has no outputs.
pub async fn get_stack_outputs<P>(provider: &P, stack_id: &str) -> DeployResult<BTreeMap<String, String>>
where
    P: StackProvider + ?Sized,
{
    let Some(stack) = get_stack(provider, stack_id).await? else {
        log::debug!("stack {} not found; no outputs", stack_id);
        return Ok(BTreeMap::new());
    };

    Ok(stack
        .outputs
        .into_iter()
        .filter_map(|o| Some((o.output_key?, o.output_value?)))
        .collect())
}

/// One entry in `GITHUB_OUTPUT` syntax. Multi-line values use the heredoc
/// form with a delimiter that does not occur in the value.
pub fn format_output(key: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{}={}\n", key, value);
    }
    let mut delimiter = String::from("ghadelimiter");
    let mut n = 0u32;
    while value.lines().any(|l| l == delimiter) {
        n += 1;
        delimiter = format!("ghadelimiter_{}", n);
    }
    format!("{}<<{}\n{}\n{}\n", key, delimiter, value, delimiter)
}

/// Append outputs to the file named by `GITHUB_OUTPUT`, or print them in the
/// same syntax when there is no such file.
pub fn write_outputs(outputs: &[(String, String)], output_file: Option<&Path>) -> DeployResult<()> {
    let rendered: String = outputs.iter().map(|(k, v)| format_output(k, v)).collect();
    match output_file {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            file.write_all(rendered.as_bytes())?;
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// Escape a message for a `::error::` workflow command.
pub fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
