//! # Horse Command Handler
//!
//! `equidectl horse <id>` prints the canonical pedigree record with that id.

use crate::commands::shared::validate_args_count_or_exit;
use crate::{PedigreeRecord, cli_utils, http_utils};

const HORSE_USAGE: &str = "Usage: equidectl horse <id>";

/// Renders a pedigree record as text.
pub fn render_horse(record: &PedigreeRecord) -> String {
    let mut lines = vec![
        format!("{} (#{})", record.name, record.id),
        format!(
            "  born:      {}",
            record
                .birth_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string())
        ),
        format!("  sex:       {}", cli_utils::or_unknown(record.sex.as_deref())),
        format!("  color:     {}", cli_utils::or_unknown(record.color.as_deref())),
        format!("  father:    {}", cli_utils::or_unknown(record.father.as_deref())),
        format!("  mother:    {}", cli_utils::or_unknown(record.mother.as_deref())),
        format!("  breeder:   {}", cli_utils::or_unknown(record.breeder.as_deref())),
    ];
    if let Some(died) = record.death_date {
        lines.push(format!("  died:      {}", died));
    }
    if let Some(link) = &record.reference_link {
        lines.push(format!("  reference: {}", link));
    }
    lines.join("\n")
}

/// Handles the horse command.
pub async fn handle_horse_command(args: &[String], client: &http_utils::EquideClient, json: bool) {
    validate_args_count_or_exit(args, 1, 1, "horse", HORSE_USAGE);
    let id: i32 = args[0].parse().unwrap_or_else(|_| {
        cli_utils::exit_with_usage_error(
            &format!("Invalid horse id '{}': expected an integer", args[0]),
            HORSE_USAGE,
        )
    });
    let id = id.to_string();
    let segments = ["horse", id.as_str()];
    let record: PedigreeRecord =
        http_utils::execute_or_exit(|| client.get(&segments, &[], "horse lookup")).await;

    if json {
        cli_utils::print_json_or_exit(&record, "horse");
    } else {
        println!("{}", render_horse(&record));
    }
}
