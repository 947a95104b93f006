use std::path::Path;

use console::Style;
use mocorr_core::movie::Movie;
use mocorr_core::pipeline::{CorrectionConfig, CorrectionOutput};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_correction_summary(config: &CorrectionConfig, input: &Path, output: &Path, movie: &Movie) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Motion Correction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    let (h, w) = movie.shape().unwrap_or((0, 0));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!("{} of {}x{}", movie.len(), w, h))
    );
    println!();

    println!("  {}", s.header.apply_to("Relaxation"));
    println!("    {:<12}{}", s.label.apply_to("Mode"), s.method.apply_to(config.relaxation.mode));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Passes"),
        s.value.apply_to(format!("up to {}", config.relaxation.max_iterations))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(format!("{} px", config.relaxation.convergence_threshold))
    );
    println!();

    println!("  {}", s.header.apply_to("Local deformation"));
    if config.local {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Fit"),
            s.value.apply_to(format!("up to {} iterations", config.fit.max_iterations))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Supersample"),
            s.value.apply_to(config.warp.supersample)
        );
        let reference = match config.warp.reference_time {
            Some(t) => t.to_string(),
            None => "first frame".to_string(),
        };
        println!("    {:<12}{}", s.label.apply_to("Reference"), s.value.apply_to(reference));
    } else {
        println!("    {}", s.disabled.apply_to("disabled (global only)"));
    }
    println!();
}

pub fn print_correction_result(output: &CorrectionOutput) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Global shifts"));
    for (frame, shift) in output.movie.frames().iter().zip(&output.global_shifts) {
        println!(
            "    {:<12}{}",
            s.label.apply_to(format!("t = {}", frame.time_stamp)),
            s.value.apply_to(format!("dy {:+.2}  dx {:+.2}", shift.dy, shift.dx))
        );
    }

    if !output.local_shifts.is_empty() {
        let largest = output
            .local_shifts
            .iter()
            .fold(0.0f64, |m, o| m.max(o.shift.magnitude()));
        println!();
        println!("  {}", s.header.apply_to("Local shifts"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Observed"),
            s.value.apply_to(output.local_shifts.len())
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Largest"),
            s.value.apply_to(format!("{largest:.2} px"))
        );
    }

    if let Some(fit) = output.fit {
        println!();
        println!("  {}", s.header.apply_to("Model fit"));
        for axis in [fit.y, fit.x] {
            let status = if axis.converged {
                s.method.apply_to("converged")
            } else {
                s.disabled.apply_to("iteration cap")
            };
            println!(
                "    {:<12}{} {}",
                s.label.apply_to(format!("{} axis", axis.axis)),
                s.value.apply_to(format!("residual {:.3e} after {} iterations,", axis.residual, axis.iterations)),
                status
            );
        }
    }
}
