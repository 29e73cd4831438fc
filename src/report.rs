use pali_morph::{Analysis, Solution, WordForm};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_analysis(analysis: &Analysis, color: bool, stages: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{} {}",
        palette.bold(palette.paint(format!("⚙  Analyzing: \"{}\"", analysis.word), ansi::CYAN)),
        palette.dim(format!("({}, {:?})", analysis.layer, analysis.parsing_type))
    );

    println!("\n{}", palette.paint("━━━ Forest ━━━", ansi::GRAY));
    if analysis.forest.root.solutions.is_empty() {
        println!("{}", palette.dim("  No solutions"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • The word is not in the dictionary and no rule pattern matched");
        println!("  • Every derivation failed validation against known combinations");
        println!("\n{}", palette.dim("  Tip: rerun with --debug to keep error-tagged branches"));
    } else {
        print_word_form(&analysis.forest.root, 1, &palette);
    }

    if stages {
        println!("\n{}", palette.paint("━━━ Stages ━━━", ansi::GRAY));
        for stage in &analysis.metrics.stages {
            println!(
                "  {} {} → {}  {}",
                palette.paint(format!("{:<12}", stage.name), ansi::BLUE),
                stage.before,
                if stage.removed() > 0 {
                    palette.paint(stage.after.to_string(), ansi::YELLOW)
                } else {
                    stage.after.to_string()
                },
                palette.dim(format!("{:?}", stage.duration)),
            );
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Build: {}  │  Pipeline: {}",
        palette.paint(format!("{:?}", analysis.metrics.total), ansi::GREEN),
        palette.paint(format!("{:?}", analysis.metrics.build), ansi::CYAN),
        palette.dim(format!("{:?}", analysis.metrics.pipeline())),
    );
    println!();
}

fn print_word_form(wf: &WordForm, depth: usize, palette: &ansi::Palette) {
    let indent = "    ".repeat(depth.saturating_sub(1));
    for (idx, s) in wf.solutions.iter().enumerate() {
        println!(
            "  {}{} {} {} {}",
            indent,
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.bold(palette.paint(&wf.entry, ansi::GREEN)),
            palette.dim("│"),
            fmt_solution(s, palette),
        );
        for (side, child) in [("L", &s.left), ("R", &s.right)] {
            if let Some(child) = child {
                println!("  {}    {}", indent, palette.dim(format!("{side}:")));
                print_word_form(child, depth + 1, palette);
            }
        }
    }
}

fn fmt_solution(s: &Solution, palette: &ansi::Palette) -> String {
    let source = if s.is_dictionary() {
        palette.paint(format!("#{}", s.content.id), ansi::BLUE)
    } else {
        let ids: Vec<String> = s.rule_ids().iter().map(u32::to_string).collect();
        palette.paint(format!("rule {}", ids.join(",")), ansi::CYAN)
    };
    let sandhi = s.sandhi.first().map(|m| format!(" {}", m.sandhi_expression)).unwrap_or_default();
    let status = if s.is_success() {
        palette.paint(format!("★{:.2}", s.rating.max(0.0) * s.collapse_rating), ansi::YELLOW)
    } else {
        palette.paint(format!("{:?}", s.content.error), ansi::RED)
    };
    format!(
        "{}{}  {} {:?}  {}",
        source,
        palette.dim(sandhi),
        palette.dim(s.content.parameters.to_string()),
        s.content.base,
        status
    )
}
