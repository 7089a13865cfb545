use valuator_form::{adjusted_caret, format_thousands, ReportTimestamp};
use web_sys::HtmlInputElement;

/// Reformats a monetary input in place, keeping the caret anchored.
///
/// The element's current text is regrouped with thousands separators; if
/// that changed anything the new text is written back and the caret is
/// shifted by the length delta so typing in the middle of a number does not
/// jump to the end.
pub fn format_currency_field(input: &HtmlInputElement) {
    let original = input.value();
    let caret = input.selection_start().ok().flatten();
    let formatted = format_thousands(&original);
    if formatted == original {
        return;
    }
    input.set_value(&formatted);
    if let Some(position) = caret {
        let restored = adjusted_caret(position, &original, &formatted);
        let _ = input.set_selection_range(restored, restored);
    }
}

/// Current calendar year from the browser clock.
pub fn current_year() -> i32 {
    js_sys::Date::new_0().get_full_year() as i32
}

/// Current local wall-clock time, minute precision.
pub fn now_timestamp() -> ReportTimestamp {
    let now = js_sys::Date::new_0();
    ReportTimestamp {
        year: now.get_full_year() as i32,
        month: now.get_month() + 1,
        day: now.get_date(),
        hour: now.get_hours(),
        minute: now.get_minutes(),
    }
}
