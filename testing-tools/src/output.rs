use colored::*;
use std::time::Duration;

use crate::webhook_client::WebhookReply;

#[derive(Debug)]
pub struct TestResult {
    pub scenario: String,
    pub passed: bool,
    pub message: Option<String>,
    pub duration: Duration,
}

pub fn print_reply(label: &str, reply: &WebhookReply) {
    let status = if reply.status < 400 {
        reply.status.to_string().green()
    } else {
        reply.status.to_string().yellow()
    };
    println!("\n[{}] {} response", label.bright_blue().bold(), status);
    if let Some(content_type) = &reply.content_type {
        println!("   content-type: {}", content_type.dimmed());
    }
    println!("   {}", reply.body.dimmed());
}

pub fn print_test_summary(results: &[TestResult]) {
    println!("\n{}", "=== TEST SUMMARY ===".bright_white().bold());

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total - passed;

    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };

        println!("[{}] {} ({:?})", status, result.scenario, result.duration);

        if let Some(msg) = &result.message {
            println!("      {}", msg.dimmed());
        }
    }

    println!(
        "\n{}: {} passed, {} failed",
        "Results".bold(),
        passed.to_string().green(),
        failed.to_string().red()
    );
}
