use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::console::ConsoleError;
use crate::models::{LeaderboardEntry, LeaderboardRow, ReportStats};

#[derive(Debug, Clone, PartialEq)]
pub struct GroupCount {
    pub name: String,
    pub count: u64,
    pub share: f64,
}

/// Largest groups first; ties by name so output is stable.
pub fn rank_groups(groups: &std::collections::BTreeMap<String, u64>) -> Vec<GroupCount> {
    let total: u64 = groups.values().sum();
    let mut ranked: Vec<GroupCount> = groups
        .iter()
        .map(|(name, count)| GroupCount {
            name: name.clone(),
            count: *count,
            share: if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64
            },
        })
        .collect();

    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked
}

pub fn resolution_rate(stats: &ReportStats) -> f64 {
    if stats.total == 0 {
        0.0
    } else {
        stats.resolved as f64 / stats.total as f64
    }
}

/// Display rows in the order the backend returned them.
pub fn leaderboard_rows(entries: &[LeaderboardEntry]) -> Vec<LeaderboardRow<'_>> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| LeaderboardRow {
            rank: index + 1,
            id: &entry.id,
            name: &entry.name,
            email: &entry.email,
            monthly_points: entry.monthly_points,
            badge: entry.badge.to_string(),
        })
        .collect()
}

pub fn render_stats(stats: &ReportStats) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total reports: {}", stats.total);
    let _ = writeln!(output, "- Pending review: {}", stats.submitted);
    let _ = writeln!(output, "- In progress: {}", stats.acknowledged);
    let _ = writeln!(
        output,
        "- Resolved: {} ({:.1}% resolution rate)",
        stats.resolved,
        resolution_rate(stats) * 100.0
    );

    write_groups(&mut output, "Reports by Department", &stats.by_department);
    write_groups(&mut output, "Reports by Severity", &stats.by_severity);

    output
}

fn write_groups(
    output: &mut String,
    title: &str,
    groups: &std::collections::BTreeMap<String, u64>,
) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    let ranked = rank_groups(groups);
    if ranked.is_empty() {
        let _ = writeln!(output, "No reports recorded.");
        return;
    }
    for group in ranked {
        let _ = writeln!(
            output,
            "- {}: {} ({:.1}%)",
            group.name,
            group.count,
            group.share * 100.0
        );
    }
}

pub fn render_leaderboard(entries: &[LeaderboardEntry], limit: usize) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Monthly Leaderboard");

    if entries.is_empty() {
        let _ = writeln!(output, "No contributors ranked this month.");
        return output;
    }

    for row in leaderboard_rows(entries).iter().take(limit) {
        let _ = writeln!(
            output,
            "- #{} {} ({}) {} pts [{}]",
            row.rank, row.name, row.email, row.monthly_points, row.badge
        );
    }

    output
}

/// Each section renders on its own; a failed fetch leaves an error line in
/// its place and the other section is still written.
pub fn build_dashboard(
    generated_at: DateTime<Utc>,
    stats: &Result<ReportStats, ConsoleError>,
    entries: &Result<Vec<LeaderboardEntry>, ConsoleError>,
    limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Civic Issues Dashboard");
    let _ = writeln!(
        output,
        "Last updated {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(output);
    match stats {
        Ok(stats) => output.push_str(&render_stats(stats)),
        Err(err) => write_failed_section(&mut output, "Overview", err),
    }
    let _ = writeln!(output);
    match entries {
        Ok(entries) => output.push_str(&render_leaderboard(entries, limit)),
        Err(err) => write_failed_section(&mut output, "Monthly Leaderboard", err),
    }

    output
}

fn write_failed_section(output: &mut String, title: &str, err: &ConsoleError) {
    let _ = writeln!(output, "## {title}");
    let _ = writeln!(output, "Error: {err}. Re-run to retry.");
}

pub fn write_leaderboard_csv(path: &Path, entries: &[LeaderboardEntry]) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    let rows = leaderboard_rows(entries);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
