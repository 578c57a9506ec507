//! `autoflow validate <file|glob>…` — parse without executing.

use engine::models::Trigger;
use engine::parser;

pub fn execute(patterns: Vec<String>, strict: bool) -> i32 {
    let mut files = Vec::new();
    for pattern in &patterns {
        match glob::glob(pattern) {
            Ok(matches) => {
                let mut matched = false;
                for entry in matches.flatten() {
                    matched = true;
                    files.push(entry);
                }
                // A literal path with no glob match still gets reported
                // against, below, as missing.
                if !matched {
                    files.push(pattern.into());
                }
            }
            Err(pattern_error) => {
                eprintln!("error: invalid file pattern '{pattern}': {pattern_error}");
                return 1;
            }
        }
    }

    if files.is_empty() {
        eprintln!("error: no workflow files found to validate");
        return 1;
    }

    let mut valid = 0usize;
    let mut invalid = 0usize;
    let mut warnings = 0usize;

    println!("validating workflow files...\n");

    for file in &files {
        println!("validating: {}", file.display());

        let parsed = match parser::parse_workflow_file(file) {
            Ok(parsed) => parsed,
            Err(parse_error) => {
                println!("  ✗ validation failed: {parse_error}\n");
                invalid += 1;
                continue;
            }
        };

        let workflow = &parsed.workflow;
        println!("  ✓ yaml syntax valid");
        println!("  ✓ workflow name: '{}'", workflow.name);
        match &workflow.trigger {
            Trigger::Cron { schedule } => {
                println!("  ✓ trigger: cron, schedule '{schedule}'");
            }
            Trigger::FileWatch { path, events } => {
                println!(
                    "  ✓ trigger: filewatch, path '{}', events {:?}",
                    path.display(),
                    events
                );
            }
        }
        println!("  ✓ actions: {}", workflow.actions.len());
        for (index, action) in workflow.actions.iter().enumerate() {
            println!("    [{}] {} ({})", index + 1, action.name(), action.kind());
        }

        for warning in &parsed.warnings {
            println!("  ⚠ warning: {warning}");
        }
        warnings += parsed.warnings.len();

        if strict && !parsed.warnings.is_empty() {
            println!("  ✗ strict mode: warnings treated as errors\n");
            invalid += 1;
            continue;
        }

        println!("  ✓ ready to deploy\n");
        valid += 1;
    }

    println!("─────────────────────────────────────");
    println!("validation summary:");
    println!("  total files: {}", files.len());
    println!("  ✓ valid: {valid}");
    println!("  ✗ invalid: {invalid}");
    if warnings > 0 {
        println!("  ⚠ warnings: {warnings}");
    }
    println!("─────────────────────────────────────");

    if invalid > 0 {
        println!("\n❌ validation failed");
        1
    } else {
        println!("\n✅ all workflows valid");
        0
    }
}
