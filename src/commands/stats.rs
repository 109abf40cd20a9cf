//! # Statistics Command Handlers
//!
//! `equidectl stats <name>` and `equidectl availability <name>`.

use crate::commands::shared::{parse_or_exit, validate_args_count_or_exit};
use crate::{Availability, HorseName, RaceStats, cli_utils, http_utils};

const STATS_USAGE: &str = "Usage: equidectl stats <name>";
const AVAILABILITY_USAGE: &str = "Usage: equidectl availability <name>";

fn format_optional(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{:.2}{}", v, unit))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Renders race statistics as aligned text.
pub fn render_stats(stats: &RaceStats) -> String {
    let p = &stats.placings;
    [
        stats.name.clone(),
        format!(
            "  races:          {} recorded / {} declared ({:.2}%)",
            stats.recorded_races, stats.declared_races, stats.precision_percent
        ),
        format!("  average speed:  {}", format_optional(stats.average_speed_kmh, " km/h")),
        format!(
            "  placings:       1st {} | 2nd {} | 3rd {} | 4th {} | 5th {} | disq. {}",
            p.first, p.second, p.third, p.fourth, p.fifth, p.disqualified
        ),
        format!("  average place:  {}", format_optional(p.average_place, "")),
        format!("  winnings:       {}", stats.total_winnings),
    ]
    .join("\n")
}

/// Renders an availability summary as text.
pub fn render_availability(summary: &Availability) -> String {
    [
        summary.name.clone(),
        format!(
            "  pedigree:       {}",
            if summary.pedigree_available { "yes" } else { "no" }
        ),
        format!(
            "  reference:      {}",
            cli_utils::or_unknown(summary.reference_link.as_deref())
        ),
        format!("  recorded races: {}", summary.recorded_races),
        format!(
            "  breed:          {}",
            cli_utils::or_unknown(summary.breed.as_deref())
        ),
    ]
    .join("\n")
}

/// Handles the stats command.
pub async fn handle_stats_command(args: &[String], client: &http_utils::EquideClient, json: bool) {
    validate_args_count_or_exit(args, 1, 1, "stats", STATS_USAGE);
    let name: HorseName = parse_or_exit(&args[0], "horse name");
    let segments = ["stats", name.as_str()];
    let stats: RaceStats =
        http_utils::execute_or_exit(|| client.get(&segments, &[], "stats")).await;

    if json {
        cli_utils::print_json_or_exit(&stats, "stats");
    } else {
        println!("{}", render_stats(&stats));
    }
}

/// Handles the availability command.
pub async fn handle_availability_command(
    args: &[String],
    client: &http_utils::EquideClient,
    json: bool,
) {
    validate_args_count_or_exit(args, 1, 1, "availability", AVAILABILITY_USAGE);
    let name: HorseName = parse_or_exit(&args[0], "horse name");
    let segments = ["availability", name.as_str()];
    let summary: Availability =
        http_utils::execute_or_exit(|| client.get(&segments, &[], "availability")).await;

    if json {
        cli_utils::print_json_or_exit(&summary, "availability");
    } else {
        println!("{}", render_availability(&summary));
    }
}
