use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

// ───────────────────────────────────────────────────────────────────────────────
// Clap Styles
// ───────────────────────────────────────────────────────────────────────────────

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ───────────────────────────────────────────────────────────────────────────────
// Palette
// ───────────────────────────────────────────────────────────────────────────────

pub mod colors {
    use crossterm::style::Color;

    pub const BLUE: Color = Color::Rgb {
        r: 70,
        g: 130,
        b: 220,
    };
    pub const GOLD: Color = Color::Rgb {
        r: 230,
        g: 190,
        b: 80,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 90,
        g: 200,
        b: 120,
    };
    pub const RED: Color = Color::Rgb {
        r: 235,
        g: 90,
        b: 90,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 245,
        g: 245,
        b: 245,
    };
}

pub mod box_chars {
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const SINGLE_HORIZONTAL: &str = "─";
    pub const SINGLE_VERTICAL: &str = "│";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const ARROW_RIGHT: &str = "▶";
    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const DIAMOND: &str = "◆";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

const SECTION_WIDTH: usize = 56;

pub fn print_banner() {
    let title = "SHUL BOARD  ·  USER ADMINISTRATION";
    let rule = box_chars::SINGLE_HORIZONTAL.repeat(title.width() + 4);
    println!();
    println!("  {}", rule.as_str().with(colors::GOLD));
    println!("    {}", title.with(colors::BLUE).bold());
    println!("  {}", rule.as_str().with(colors::GOLD));
    println!();
}

// ───────────────────────────────────────────────────────────────────────────────
// Status lines
// ───────────────────────────────────────────────────────────────────────────────

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;

    println!();
    print!("{}", box_chars::ROUND_TOP_LEFT.with(colors::BLUE));
    print!(
        "{}",
        box_chars::SINGLE_HORIZONTAL.repeat(padding).with(colors::BLUE)
    );
    print!(
        " {} ",
        title.with(colors::BLUE).bold().attribute(Attribute::Italic)
    );
    print!(
        "{}",
        box_chars::SINGLE_HORIZONTAL
            .repeat(SECTION_WIDTH.saturating_sub(title_len + 4 + padding))
            .with(colors::BLUE)
    );
    println!("{}", box_chars::ROUND_TOP_RIGHT.with(colors::BLUE));
}

pub fn print_section_footer() {
    print!("{}", box_chars::ROUND_BOTTOM_LEFT.with(colors::BLUE));
    print!(
        "{}",
        box_chars::SINGLE_HORIZONTAL
            .repeat(SECTION_WIDTH)
            .with(colors::BLUE)
    );
    println!("{}", box_chars::ROUND_BOTTOM_RIGHT.with(colors::BLUE));
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::GOLD),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_list_item(item: &str, indent: usize) {
    println!(
        "{}{}  {}",
        "  ".repeat(indent),
        box_chars::ARROW_RIGHT.with(colors::BLUE),
        item.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

// ───────────────────────────────────────────────────────────────────────────────
// Tables
// ───────────────────────────────────────────────────────────────────────────────

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<&str>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(cell.width());
            }
        }
        self.rows.push(row.into_iter().map(String::from).collect());
    }

    fn print_border(&self, left: &str, junction: &str, right: &str) {
        print!("{}", left.with(colors::BLUE));
        for (i, width) in self.col_widths.iter().enumerate() {
            print!(
                "{}",
                box_chars::SINGLE_HORIZONTAL
                    .repeat(width + 2)
                    .with(colors::BLUE)
            );
            if i + 1 < self.col_widths.len() {
                print!("{}", junction.with(colors::BLUE));
            }
        }
        println!("{}", right.with(colors::BLUE));
    }

    fn print_row(&self, cells: &[String], color: CtColor, bold: bool) {
        print!("{}", box_chars::SINGLE_VERTICAL.with(colors::BLUE));
        for (i, cell) in cells.iter().enumerate() {
            let width = self.col_widths.get(i).copied().unwrap_or(0);
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            if bold {
                print!(" {}{} ", cell.as_str().with(color).bold(), padding);
            } else {
                print!(" {}{} ", cell.as_str().with(color), padding);
            }
            print!("{}", box_chars::SINGLE_VERTICAL.with(colors::BLUE));
        }
        println!();
    }

    pub fn print(&self) {
        self.print_border(
            box_chars::ROUND_TOP_LEFT,
            box_chars::T_TOP,
            box_chars::ROUND_TOP_RIGHT,
        );
        self.print_row(&self.headers, colors::BLUE, true);
        self.print_border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_row(row, colors::WHITE, false);
        }
        self.print_border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        );
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Prompt, welcome and help
// ───────────────────────────────────────────────────────────────────────────────

pub fn get_prompt() -> String {
    format!(
        "{}{} ",
        "shul".with(colors::BLUE).bold(),
        "❯".with(colors::GOLD).bold(),
    )
}

pub fn print_command_echo(command: &str) {
    println!(
        "{}  {}",
        "❯".with(colors::GOLD).bold(),
        command.with(colors::GREEN).bold()
    );
}

pub fn print_welcome(db_path: &str) {
    print_banner();
    print_key_value("Database", db_path);
    print_key_value("Version", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  {}", "Type 'help' for available commands".with(colors::DIM));
    println!();
}

pub struct CommandHelp {
    pub name: &'static str,
    pub args: &'static str,
    pub description: &'static str,
}

fn print_command_group(title: &str, commands: &[&CommandHelp], color: CtColor) {
    println!(
        "  {} {}",
        box_chars::DIAMOND.with(color),
        title.with(color).bold()
    );
    for cmd in commands {
        println!(
            "      {} {}  {}",
            cmd.name.with(colors::GREEN).bold(),
            cmd.args.with(colors::DIM),
            cmd.description.with(colors::WHITE)
        );
    }
    println!();
}

pub fn print_help(commands: &[CommandHelp]) {
    print_section_header("Available Commands");
    println!();

    let in_group = |names: &[&str]| {
        commands
            .iter()
            .filter(|c| names.contains(&c.name))
            .collect::<Vec<_>>()
    };

    print_command_group(
        "Users",
        &in_group(&["add-user", "user-handles", "show", "set-role"]),
        colors::BLUE,
    );
    print_command_group(
        "Passwords",
        &in_group(&[
            "add-login",
            "update-login",
            "delete-login",
            "check-password",
        ]),
        colors::GOLD,
    );
    print_command_group("System", &in_group(&["where", "help", "exit"]), colors::DIM);

    print_section_footer();
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Shavua tov.".with(colors::GOLD).bold());
    println!();
}
