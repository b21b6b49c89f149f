//! Markdown rendering of a cycle result

use pulse_core::{MarketTiming, OpportunitySource};
use pulse_runtime::CycleResult;

/// Render the ranked opportunity list as a markdown report
pub fn markdown_report(result: &CycleResult) -> String {
    let mut out = String::new();

    out.push_str("# TrendPulse Cycle Report\n\n");
    out.push_str(&format!(
        "Started {} · {} collected · {} accepted · rejection rate {:.0}%\n\n",
        result.started_at.format("%Y-%m-%d %H:%M UTC"),
        result.report.collected,
        result.report.accepted,
        result.report.rejection_rate * 100.0,
    ));

    if result.flags.any_degraded() {
        out.push_str("## Degradation\n\n");
        if result.flags.placeholder {
            out.push_str("- placeholder result: no validated signals this cycle\n");
        }
        for source in &result.flags.failed_sources {
            out.push_str(&format!("- collector `{source}` failed or timed out\n"));
        }
        for (stage, outcome) in [
            ("correlation", result.flags.correlation),
            ("temporal", result.flags.temporal),
            ("graph", result.flags.graph),
        ] {
            if outcome.is_degraded() {
                out.push_str(&format!("- {stage} stage: {outcome:?}\n"));
            }
        }
        out.push('\n');
    }

    out.push_str("## Opportunities\n\n");
    out.push_str("| # | Opportunity | Momentum | Confidence | Timing | Source |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for (rank, opp) in result.opportunities.iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {} | {} |\n",
            rank + 1,
            opp.title,
            opp.momentum,
            opp.confidence,
            timing_label(opp.timing),
            source_label(&opp.origin),
        ));
    }

    out.push('\n');
    for opp in &result.opportunities {
        out.push_str(&format!("### {}\n\n{}\n\n", opp.title, opp.description));
        if !opp.platforms.is_empty() {
            out.push_str(&format!("Platforms: {}\n\n", opp.platforms.join(", ")));
        }
    }

    out
}

fn timing_label(timing: MarketTiming) -> &'static str {
    match timing {
        MarketTiming::Early => "early",
        MarketTiming::Emerging => "emerging",
        MarketTiming::Hot => "hot",
        MarketTiming::Saturated => "saturated",
    }
}

fn source_label(origin: &OpportunitySource) -> &'static str {
    match origin {
        OpportunitySource::KeywordGroup { .. } => "keyword group",
        OpportunitySource::GraphCluster { .. } => "graph cluster",
        OpportunitySource::UniversalTrend { .. } => "universal trend",
        OpportunitySource::Placeholder => "placeholder",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_core::{DegradationFlags, QualityReport};

    #[test]
    fn test_report_contains_table_and_degradation() {
        let result = CycleResult {
            opportunities: Vec::new(),
            report: QualityReport::default(),
            flags: DegradationFlags {
                failed_sources: vec!["reddit-poller".to_string()],
                ..Default::default()
            },
            started_at: Utc::now(),
            elapsed_ms: 12,
        };

        let md = markdown_report(&result);
        assert!(md.contains("# TrendPulse Cycle Report"));
        assert!(md.contains("| # | Opportunity |"));
        assert!(md.contains("reddit-poller"));
    }
}
