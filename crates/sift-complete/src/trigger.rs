//! Deciding whether a text change should open (or close) the suggestion list.

use sift_core::{Point, TextChange};

/// Two-character insertions produced by bracket auto-pairing.
pub const BRACKET_PAIRS: &[&str] = &[
    "()", "[]", "{}", "\"\"", "''", "``", "\u{201C}\u{201D}", "\u{2018}\u{2019}", "\u{AB}\u{BB}",
    "\u{2039}\u{203A}",
];

/// Whether inserted (or deleted) `text` looks like typing.
///
/// A lone space, a single non-whitespace character (surrounding whitespace
/// ignored), or an auto-paired bracket.
pub fn is_activating_text(text: &str) -> bool {
    if text == " " {
        return true;
    }
    if text.trim().chars().count() == 1 {
        return true;
    }
    text.chars().count() == 2 && BRACKET_PAIRS.contains(&text)
}

/// Editor and list state relevant to a trigger decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerContext {
    pub auto_activation: bool,
    pub list_active: bool,
    pub backspace_triggers: bool,
    /// An input-method composition is in progress.
    pub composition: bool,
}

/// `None` when no change touches the last cursor, `Some(true)` to arm the
/// trigger, `Some(false)` to hide. A change at the cursor that cannot
/// activate (auto-activation off and no usable open list) still hides.
pub fn decide(changes: &[TextChange], last_cursor: Point, ctx: TriggerContext) -> Option<bool> {
    if !changes
        .iter()
        .any(|change| change.new_range.contains_point(last_cursor))
    {
        return None;
    }
    if !(ctx.auto_activation || (ctx.list_active && !ctx.composition)) {
        return Some(false);
    }

    let activate = changes.iter().any(|change| {
        if !change.new_text.is_empty() {
            is_activating_text(&change.new_text)
        } else if !change.old_text.is_empty() {
            (ctx.backspace_triggers || ctx.list_active) && is_activating_text(&change.old_text)
        } else {
            false
        }
    });
    Some(activate)
}
