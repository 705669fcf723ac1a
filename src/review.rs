//! Terminal rendering for feedback, history, and analytics.

use anyhow::Result;
use orator_api::{AnalysisResponse, ApiClient, Feedback, Section};
use tokio::runtime::Runtime;

pub fn history(runtime: &Runtime, client: &ApiClient) -> Result<()> {
    let history = runtime.block_on(client.history())?;
    println!(
        "{} speeches for {} <{}>",
        history.speeches.len(),
        history.user.username,
        history.user.email
    );
    for speech in &history.speeches {
        println!("\n#{}  {}", speech.id, speech.created_at);
        println!("  {}", snippet(&speech.transcript, 100));
        if let Some(feedback) = &speech.feedback {
            if let Some(overall) = &feedback.overall {
                if let Some(score) = overall.score {
                    println!("  overall: {score:.1}/10");
                }
            }
        }
    }
    Ok(())
}

pub fn progress(runtime: &Runtime, client: &ApiClient) -> Result<()> {
    let progress = runtime.block_on(client.progress())?;
    println!(
        "{} sessions recorded for {}",
        progress.total_sessions, progress.user
    );
    for point in &progress.progress {
        println!(
            "  {}  overall {}  (content {}, delivery {}, grammar {})",
            point.date,
            fmt_score(point.score_overall),
            fmt_score(point.score_content),
            fmt_score(point.score_delivery),
            fmt_score(point.score_grammar),
        );
    }
    Ok(())
}

pub fn analytics(runtime: &Runtime, client: &ApiClient) -> Result<()> {
    let stats = runtime.block_on(client.analytics())?;
    println!("Averages over {} speeches:", stats.total_speeches);
    println!("  opening   {:.2}", stats.avg_opening);
    println!("  content   {:.2}", stats.avg_content);
    println!("  delivery  {:.2}", stats.avg_delivery);
    println!("  grammar   {:.2}", stats.avg_grammar);
    println!("  overall   {:.2}", stats.avg_overall);
    if let Some(best) = stats.best_score {
        println!("  best      {best:.2}");
    }
    Ok(())
}

pub fn print_analysis(analysis: &AnalysisResponse) {
    if let Some(transcript) = &analysis.transcript {
        println!("\nTranscript:\n{transcript}\n");
    }
    print_feedback(&analysis.feedback);
}

fn print_feedback(feedback: &Feedback) {
    print_section("Opening", feedback.opening.as_ref());
    print_section("Content", feedback.content.as_ref());
    print_section("Delivery", feedback.delivery.as_ref());
    print_section("Grammar", feedback.grammar.as_ref());

    if let Some(overall) = &feedback.overall {
        println!("Overall:");
        if let Some(summary) = &overall.summary {
            println!("  {summary}");
        }
        if let Some(score) = overall.score {
            println!("  score: {score:.1}/10");
        }
    }

    if !feedback.suggestions.is_empty() {
        println!("Suggestions:");
        for suggestion in &feedback.suggestions {
            println!("  - {suggestion}");
        }
    }

    if let Some(count) = feedback.word_count {
        println!("Word count: {count}");
    }
    if let Some(len) = feedback.avg_sentence_length {
        println!("Avg sentence length: {len:.1} words");
    }
    if !feedback.filler_words.is_empty() {
        let fillers: Vec<String> = feedback
            .filler_words
            .iter()
            .map(|(word, count)| format!("{word}({count})"))
            .collect();
        println!("Filler words: {}", fillers.join(", "));
    }
}

fn print_section(name: &str, section: Option<&Section>) {
    let Some(section) = section else { return };
    println!("{name}:");
    if let Some(summary) = section.summary() {
        println!("  {summary}");
    }
    if let Some(score) = section.score() {
        println!("  score: {score:.1}/10");
    }
    if let Section::Detailed(detail) = section {
        for s in &detail.strengths {
            println!("  + {s}");
        }
        for w in &detail.weaknesses {
            println!("  - {w}");
        }
    }
}

fn fmt_score(score: Option<f32>) -> String {
    match score {
        Some(s) => format!("{s:.1}"),
        None => "-".into(),
    }
}

fn snippet(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_owned();
    }
    trimmed.chars().take(max).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_on_char_boundaries() {
        assert_eq!(snippet("short", 10), "short");
        assert_eq!(snippet("  padded  ", 10), "padded");
        let long = "a".repeat(120);
        let cut = snippet(&long, 100);
        assert_eq!(cut.chars().count(), 101);
        assert!(cut.ends_with('…'));
    }
}
