//! `airtime report` — print aggregated stats for a meeting.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::stats::{self, format_clock};
use crate::store::{self, StatsRepository};

use super::args::ReportCliArgs;

pub fn handle_report_command(args: ReportCliArgs) -> Result<()> {
    let config = Config::load()?;
    let conn = store::init_db()?;

    let participants = StatsRepository::latest_participants_by_meeting(&conn, &args.meeting)?;
    let overall = StatsRepository::latest_overall_by_meeting(&conn, &args.meeting)?;

    if participants.is_empty() && overall.is_empty() {
        bail!("No stats recorded for meeting '{}'", args.meeting);
    }

    println!("Meeting: {}", args.meeting);

    for room in &overall {
        println!();
        println!("Room: {}", room.room_name);
        println!(
            "  {} participants, {} total speaking time, average balance {}",
            room.total_participants,
            format_clock(room.total_speaking_time_ms),
            room.average_balance_score
                .map(|s| format!("{:.0}", s))
                .unwrap_or_else(|| "-".to_string()),
        );

        println!(
            "  {:<24} {:>6} {:>8} {:>8} {:>7} {:>7}",
            "Participant", "Count", "Total", "Avg", "Share", "Balance"
        );
        for row in participants.iter().filter(|p| p.room_name == room.room_name) {
            let score = row.balance_score.unwrap_or(0).clamp(0, 100) as u8;
            let bucket = stats::balance_status(score, &config.balance);
            println!(
                "  {:<24} {:>6} {:>8} {:>8} {:>6.1}% {:>3} ({})",
                row.display_name,
                row.speaking_count,
                format_clock(row.total_speaking_ms),
                format_clock(store::fill_average(row)),
                row.speaking_share.unwrap_or(0.0),
                score,
                bucket.as_str(),
            );
        }
    }

    Ok(())
}
