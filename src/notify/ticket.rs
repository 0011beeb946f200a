use crate::types::{non_empty, BalloonEvent, Contest, FirstSolve};

pub const SEPARATOR: &str = "--------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    Normal,
    /// Double width and double height.
    Emphasized,
}

/// One printer instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Justify(Justification),
    Mode(PrintMode),
    Text(String),
    Feed(u8),
}

/// A fully laid out balloon slip, independent of the output device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ticket {
    pub segments: Vec<Segment>,
}

impl Ticket {
    fn push(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Segment::Text(text.into()))
    }

    /// Text content only, with feeds expanded to newlines.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Feed(lines) => {
                    for _ in 0..*lines {
                        out.push('\n');
                    }
                }
                Segment::Justify(_) | Segment::Mode(_) => {}
            }
        }
        out
    }
}

/// Lay out the slip for one balloon.
pub fn render(event: &BalloonEvent, contest: &Contest, comment: Option<FirstSolve>) -> Ticket {
    let location = non_empty(event.location.as_deref());
    let color = non_empty(event.color.as_deref());

    let mut ticket = Ticket::default();

    // Header: large and centred so runners can sort slips at a glance.
    ticket
        .push(Segment::Justify(Justification::Center))
        .push(Segment::Mode(PrintMode::Emphasized))
        .text("BALLOON\n")
        .push(Segment::Feed(1))
        .text(format!("No. {}\n", event.id))
        .push(Segment::Feed(1));

    let compact: Vec<&str> = [location, color].into_iter().flatten().collect();
    if !compact.is_empty() {
        ticket.text(format!("{}\n", compact.join(" "))).push(Segment::Feed(1));
    }

    ticket
        .push(Segment::Justify(Justification::Left))
        .push(Segment::Mode(PrintMode::Normal))
        .text(body(event, contest, location, color, comment))
        .text(format!("{SEPARATOR}\n"))
        .push(Segment::Feed(3));

    ticket
}

fn body(
    event: &BalloonEvent,
    contest: &Contest,
    location: Option<&str>,
    color: Option<&str>,
    comment: Option<FirstSolve>,
) -> String {
    let mut out = String::from("\nA problem has been solved:\n\n");

    if let Some(location) = location {
        out.push_str(&format!("Location: {location}\n"));
    }
    out.push_str(&format!("Contest:  {} (c{})\n", contest.name, contest.id));
    out.push_str(&format!("Team:     {} (t{})\n", event.team_name, event.team_id));

    out.push_str(&format!("Problem:  {}", event.problem_short_name));
    if non_empty(Some(event.problem_name.as_str())).is_some_and(|n| n != event.problem_short_name) {
        out.push_str(&format!(": {}", event.problem_name));
    }
    if let Some(color) = color {
        out.push_str(&format!(" (colour: {color})"));
    }
    out.push_str("\n\n");

    out.push_str("Current balloon status for this team:\n");
    for problem in &event.team_solved.problems {
        out.push_str(&format!(" - {}", problem.short_name));
        if let Some(color) = non_empty(problem.color.as_deref()) {
            out.push_str(&format!(" (colour: {color})"));
        }
        out.push('\n');
    }

    if let Some(comment) = comment {
        out.push_str(&format!("\nNOTE: {comment}\n"));
    }

    out
}
