use comfy_table::{presets::ASCII_FULL, Table};
use kube_count::{CountError, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
pub(crate) enum OutputFormat {
    #[strum(to_string = "table", serialize = "t")]
    Table,
    #[strum(to_string = "json", serialize = "j")]
    Json,
    #[strum(to_string = "yaml", serialize = "y")]
    Yaml,
}

/// Kind and GroupVersion are printed once per run of rows of the same type.
fn table(records: &[Record]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(["Namespace", "Kind", "GroupVersion", "Count"]);
    let mut previous = None;
    for r in records {
        let (kind, group_version) = if previous == Some(&r.identity) {
            (String::new(), String::new())
        } else {
            (r.identity.kind.clone(), r.identity.group_version())
        };
        table.add_row([r.namespace.clone(), kind, group_version, r.count.to_string()]);
        previous = Some(&r.identity);
    }
    table.to_string()
}

/// Renders records; the result always ends with a newline
pub(crate) fn render(records: &[Record], format: OutputFormat) -> Result<String, CountError> {
    let mut out = match format {
        OutputFormat::Table => table(records),
        OutputFormat::Json => {
            serde_json::to_string_pretty(records).map_err(|e| CountError::Render {
                format: "JSON",
                source: Box::new(e),
            })?
        }
        OutputFormat::Yaml => serde_yaml::to_string(records).map_err(|e| CountError::Render {
            format: "YAML",
            source: Box::new(e),
        })?,
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
