use std::fmt::Write;

use crate::action::{ActionKind, ActionRecommendation};
use crate::analysis::StateAnalysis;
use crate::opponent::OpponentSummary;
use crate::state::MatchSnapshot;

/// Customize snapshot and analysis rendering for CLI visualization.
#[derive(Clone, Copy, Debug)]
pub struct VisualOptions {
    pub show_hand_indices: bool,
    pub show_threat_details: bool,
    pub show_goal_health: bool,
}

impl Default for VisualOptions {
    fn default() -> Self {
        Self {
            show_hand_indices: true,
            show_threat_details: true,
            show_goal_health: true,
        }
    }
}

/// Fine tune textual recommendation descriptions.
#[derive(Clone, Copy, Debug)]
pub struct DescribeOptions {
    pub include_reasoning: bool,
    pub include_timing: bool,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self {
            include_reasoning: true,
            include_timing: true,
        }
    }
}

pub fn render_snapshot(snapshot: &MatchSnapshot, analysis: &StateAnalysis) -> String {
    render_snapshot_with_options(snapshot, analysis, VisualOptions::default())
}

pub fn render_snapshot_with_options(
    snapshot: &MatchSnapshot,
    analysis: &StateAnalysis,
    options: VisualOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "t={:.1}s  elixir {:.1}  mode {:?}",
        snapshot.now(),
        snapshot.resource(),
        analysis.mode
    );
    if options.show_goal_health {
        let h = &snapshot.goal_health;
        let _ = writeln!(
            out,
            "Goals: own {:.0}%/{:.0}%/{:.0}%  enemy {:.0}%/{:.0}%/{:.0}%",
            h.own_left * 100.0,
            h.own_king * 100.0,
            h.own_right * 100.0,
            h.enemy_left * 100.0,
            h.enemy_king * 100.0,
            h.enemy_right * 100.0,
        );
    }
    if snapshot.own_hand.is_empty() {
        let _ = writeln!(out, "Hand: (empty)");
    } else {
        let entries = snapshot
            .own_hand
            .iter()
            .enumerate()
            .map(|(idx, card)| {
                let playable = snapshot.own_playable_indices.contains(&idx);
                let marker = if playable { "" } else { "*" };
                if options.show_hand_indices {
                    format!("{idx}:{card}{marker}")
                } else {
                    format!("{card}{marker}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "Hand: {entries}");
    }

    if analysis.threats.is_empty() {
        let _ = writeln!(out, "Threats: none");
    } else {
        let _ = writeln!(out, "Threats:");
        for threat in &analysis.threats {
            let name = threat
                .card
                .map(|c| c.to_string())
                .unwrap_or_else(|| String::from("unknown"));
            if options.show_threat_details {
                let _ = writeln!(
                    out,
                    "  {:?} {name} at ({}, {}), {:.1} tiles from goal{}",
                    threat.level,
                    threat.position.x,
                    threat.position.y,
                    threat.distance_to_goal,
                    if threat.requires_immediate_response {
                        " !"
                    } else {
                        ""
                    }
                );
            } else {
                let _ = writeln!(out, "  {:?} {name}", threat.level);
            }
        }
    }
    for opportunity in &analysis.opportunities {
        let _ = writeln!(
            out,
            "Opportunity: {} lane, deficit {}, confidence {:.2}",
            opportunity.lane, opportunity.opponent_deficit, opportunity.confidence
        );
    }
    let _ = writeln!(out, "Strategy: {}", analysis.recommended_strategy);
    out
}

pub fn describe_recommendation(rec: &ActionRecommendation) -> String {
    describe_recommendation_with_options(rec, DescribeOptions::default())
}

pub fn describe_recommendation_with_options(
    rec: &ActionRecommendation,
    options: DescribeOptions,
) -> String {
    let mut out = match (rec.kind, rec.card, rec.position) {
        (ActionKind::Wait, _, _) => String::from("wait"),
        (kind, Some(card), Some(tile)) => {
            format!("{} {card} at ({}, {})", kind_label(kind), tile.x, tile.y)
        }
        (kind, Some(card), None) => format!("{} {card}", kind_label(kind)),
        (kind, None, _) => kind_label(kind).to_string(),
    };
    let _ = write!(
        out,
        " [priority {}, confidence {:.2}]",
        rec.priority, rec.confidence
    );
    if options.include_timing && rec.timing_delay > 0.0 {
        let _ = write!(out, " after {:.1}s", rec.timing_delay);
    }
    if options.include_reasoning && !rec.reasoning.is_empty() {
        let _ = write!(out, " - {}", rec.reasoning.join("; "));
    }
    out
}

pub fn render_opponent(summary: &OpponentSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Opponent: {} plays, avg cost {:.1}, style {:?}",
        summary.total_plays, summary.average_cost, summary.play_style
    );
    match summary.archetype {
        Some(archetype) => {
            let _ = writeln!(
                out,
                "  Archetype: {archetype} ({:.0}%)",
                summary.archetype_confidence * 100.0
            );
        }
        None => {
            let _ = writeln!(out, "  Archetype: unknown");
        }
    }
    let seen = summary
        .cards_seen
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        out,
        "  Seen: {}",
        if seen.is_empty() { "-" } else { seen.as_str() }
    );
    if let Some(cycle) = summary.cycle_length {
        let _ = writeln!(out, "  Cycle length: {cycle}");
    }
    let _ = writeln!(
        out,
        "  Aggressiveness {:.2}  patience {:.2}  adaptation {:.2}",
        summary.behavior.aggressiveness, summary.behavior.patience, summary.behavior.adaptation
    );
    out
}

fn kind_label(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Play => "play",
        ActionKind::Wait => "wait",
        ActionKind::Defend => "defend with",
        ActionKind::Attack => "attack with",
        ActionKind::Combo => "combo",
        ActionKind::Cycle => "cycle",
    }
}
