//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        println!("{} {}", style("◆").cyan(), style(title).cyan().bold());
    } else {
        println!("{}", style(title).cyan().bold());
    }
    println!();
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    println!();
    if ctx.use_fancy_output() {
        println!("{} {}", style("✓").green(), style(message).green().bold());
    } else {
        println!("{} {}", style("[OK]").green(), message);
    }
}

/// Display error outro
pub fn outro_error(ctx: &UiContext, message: &str) {
    println!();
    if ctx.use_fancy_output() {
        println!("{} {}", style("✗").red(), style(message).red().bold());
    } else {
        println!("{} {}", style("[ERROR]").red(), message);
    }
}

/// Display warning outro
pub fn outro_warn(ctx: &UiContext, message: &str) {
    println!();
    if ctx.use_fancy_output() {
        println!("{} {}", style("!").yellow(), style(message).yellow().bold());
    } else {
        println!("{} {}", style("[WARN]").yellow(), message);
    }
}

/// Format a success line (for printing through a progress bar)
pub fn line_ok(ctx: &UiContext, message: &str) -> String {
    if ctx.use_fancy_output() {
        format!("  {} {}", style("✓").green(), message)
    } else {
        format!("  {} {}", style("[OK]").green(), message)
    }
}

/// Format an informational line
pub fn line_info(ctx: &UiContext, message: &str) -> String {
    if ctx.use_fancy_output() {
        format!("  {} {}", style("•").cyan(), style(message).dim())
    } else {
        format!("  {} {}", style("[SKIP]").cyan(), message)
    }
}

/// Format a failure line with detail
pub fn line_error(ctx: &UiContext, message: &str, detail: &str) -> String {
    if ctx.use_fancy_output() {
        format!("  {} {}: {}", style("✗").red(), message, style(detail).red())
    } else {
        format!("  {} {}: {}", style("[FAIL]").red(), message, detail)
    }
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    println!("{}", line_ok(ctx, message));
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {}", style("!").yellow(), message);
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

/// Display an error step
pub fn step_error(ctx: &UiContext, message: &str, detail: &str) {
    println!("{}", line_error(ctx, message, detail));
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("  {} {}", style("•").cyan(), message);
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Display a remark/hint
pub fn remark(_ctx: &UiContext, message: &str) {
    println!("  {}", style(message).dim());
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        intro(&ctx, "Test");
        outro_success(&ctx, "Done");
        step_ok(&ctx, "Step completed");
        step_warn(&ctx, "Warning");
        step_error(&ctx, "Error", "detail");
    }

    #[test]
    fn plain_lines_carry_tags() {
        console::set_colors_enabled(false);
        let ctx = UiContext::non_interactive();
        assert_eq!(line_ok(&ctx, "ui.pvr.ccz"), "  [OK] ui.pvr.ccz");
        assert_eq!(
            line_error(&ctx, "hud.pvr.ccz", "exit code 3"),
            "  [FAIL] hud.pvr.ccz: exit code 3"
        );
    }
}
