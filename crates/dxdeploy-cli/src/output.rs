use colored::Colorize;
use dxdeploy_core::DeployReport;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_summary(report: &DeployReport) {
    println!("{}", render_summary(report));
    if report.is_success() {
        print_success("Deployment finished");
    } else {
        print_error(&format!("Deployment finished with {} failure(s)", report.failed));
    }
}

fn render_summary(report: &DeployReport) -> String {
    let rows = [
        ("Synced", report.synced, report.synced.to_string().green()),
        ("Seeded", report.seeded, report.seeded.to_string().green()),
        ("Tested", report.tested, report.tested.to_string().green()),
        ("Skipped", report.skipped, report.skipped.to_string().yellow()),
        ("Failed", report.failed, report.failed.to_string().red()),
    ];
    rows.iter()
        .map(|(label, count, value)| {
            if *count == 0 {
                format!("{:<8} {count}", format!("{label}:").cyan())
            } else {
                format!("{:<8} {value}", format!("{label}:").cyan())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_summary() {
        colored::control::set_override(false);
        let report = DeployReport {
            synced: 3,
            skipped: 1,
            failed: 0,
            seeded: 1,
            tested: 1,
        };
        assert_eq!(
            render_summary(&report),
            "Synced:  3\nSeeded:  1\nTested:  1\nSkipped: 1\nFailed:  0"
        );
    }
}
