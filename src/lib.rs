use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default form contents used when no saved form exists.
pub mod defaults {
    pub const COMPANY_NAME: &str = "A Company Making Everything (ACME)";
    pub const COUNTRY_CODE: &str = "KZ";
    pub const YEARS_FORECAST: usize = 3;
    pub const VENTURE_RATE_PERCENT: i64 = 40;
    pub const MARKET_SHARE_PERCENT: i64 = 1;
}

/// Separator inserted every three digits in displayed monetary values.
pub const THOUSANDS_SEPARATOR: char = ',';

// Compiled regexes for monetary input and report sanitization
static NON_DIGIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());
static SCRIPT_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static SCRIPT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?script\b[^>]*>").unwrap());
static EVENT_HANDLER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap());
static JS_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s(href|src)\s*=\s*("javascript:[^"]*"|'javascript:[^']*'|javascript:[^\s>]+)"#)
        .unwrap()
});

/// The JSON payload posted to the valuation backend.
///
/// Field names follow the wire contract (camelCase). The three financial
/// series are index-aligned: index 0 corresponds to `data_first_year`, and
/// all three have the same length (the forecast horizon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub name: String,
    pub country: String,
    pub data_first_year: i32,
    pub revenue: Vec<f64>,
    pub ebitda: Vec<f64>,
    pub free_cash_flow: Vec<f64>,
    pub cash: f64,
    pub equity: f64,
    pub debt: f64,
    pub equity_rate: f64,
    pub debt_rate: f64,
    pub venture_rate: f64,
    pub market_share: f64,
    pub comparable_stock: String,
    pub venture_exit_year: i32,
}

impl ValuationRequest {
    /// Number of forecast years covered by the financial series.
    pub fn forecast_horizon(&self) -> usize {
        self.revenue.len()
    }

    /// Last year of the financials data period, inclusive. Saturates at
    /// the `i32` extremes rather than wrapping on absurd input years.
    pub fn last_forecast_year(&self) -> i32 {
        self.data_first_year.saturating_add(self.revenue.len() as i32 - 1)
    }
}

/// A previously persisted form, where any field may be absent.
///
/// Saved blobs written by older builds can miss keys (or carry extra ones,
/// which are ignored); restoring applies only the fields that are present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedForm {
    pub name: Option<String>,
    pub country: Option<String>,
    pub data_first_year: Option<i32>,
    pub revenue: Option<Vec<f64>>,
    pub ebitda: Option<Vec<f64>>,
    pub free_cash_flow: Option<Vec<f64>>,
    pub cash: Option<f64>,
    pub equity: Option<f64>,
    pub debt: Option<f64>,
    pub equity_rate: Option<f64>,
    pub debt_rate: Option<f64>,
    pub venture_rate: Option<f64>,
    pub market_share: Option<f64>,
    pub comparable_stock: Option<String>,
    pub venture_exit_year: Option<i32>,
}

/// One row of the financials table: the three monetary cells as shown,
/// thousands separators included. The year label is derived, not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRow {
    pub revenue: String,
    pub ebitda: String,
    pub free_cash_flow: String,
}

impl Default for FinancialRow {
    /// Fresh cells hold a literal zero, the same text a restored zero
    /// amount formats to.
    fn default() -> Self {
        Self {
            revenue: "0".to_string(),
            ebitda: "0".to_string(),
            free_cash_flow: "0".to_string(),
        }
    }
}

/// Typed mirror of the live form.
///
/// Every scalar field holds its display text: monetary fields keep their
/// separators, rate fields keep whole-number percent text. A
/// [`ValuationRequest`] is derived on demand via [`FormState::to_request`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub name: String,
    pub country_code: String,
    pub data_first_year: String,
    pub forecast_horizon: String,
    pub rows: Vec<FinancialRow>,
    pub cash: String,
    pub equity: String,
    pub debt: String,
    pub equity_rate: String,
    pub debt_rate: String,
    pub venture_rate: String,
    pub market_share: String,
    pub comparable_stock: String,
    pub venture_exit_year: String,
}

impl FormState {
    /// Fresh form with the hardcoded defaults and the row table already
    /// sized to the default horizon.
    pub fn with_defaults(current_year: i32) -> Self {
        let mut state = Self {
            name: defaults::COMPANY_NAME.to_string(),
            country_code: defaults::COUNTRY_CODE.to_string(),
            data_first_year: current_year.to_string(),
            forecast_horizon: defaults::YEARS_FORECAST.to_string(),
            rows: Vec::new(),
            cash: "0".to_string(),
            equity: "0".to_string(),
            debt: "0".to_string(),
            equity_rate: "0".to_string(),
            debt_rate: "0".to_string(),
            venture_rate: defaults::VENTURE_RATE_PERCENT.to_string(),
            market_share: defaults::MARKET_SHARE_PERCENT.to_string(),
            comparable_stock: String::new(),
            venture_exit_year: current_year.to_string(),
        };
        state.adjust_rows();
        state
    }

    /// First year of the financials data period, `0` if the field is not a
    /// number.
    pub fn base_year(&self) -> i32 {
        parse_int(&self.data_first_year)
    }

    /// Requested forecast horizon, `0` if the field is not a number.
    pub fn horizon(&self) -> usize {
        self.forecast_horizon.trim().parse().unwrap_or(0)
    }

    /// Year label shown in column 1 of the given table row (1-based).
    /// Saturating, so an extreme typed base year cannot wrap.
    pub fn year_label(&self, row: usize) -> i32 {
        self.base_year().saturating_add(row as i32 - 1)
    }

    /// Resizes the row table so its length equals the forecast horizon.
    ///
    /// Appended rows come up with zeroed monetary cells; excess rows are
    /// dropped from the end. Year labels need no fixup here because they are
    /// recomputed from `data_first_year` on every render.
    pub fn adjust_rows(&mut self) {
        let required = self.horizon();
        let current = self.rows.len();
        if required != current {
            debug!("Adjusting financials rows: {current} -> {required}");
            self.rows.resize_with(required, FinancialRow::default);
        }
    }

    /// Reads every mapped field into a [`ValuationRequest`].
    ///
    /// Percent fields are divided by 100, monetary text is stripped of
    /// separators before conversion, and any numeric parse failure degrades
    /// to `0` instead of propagating.
    pub fn to_request(&self) -> ValuationRequest {
        ValuationRequest {
            name: self.name.clone(),
            country: self.country_code.clone(),
            data_first_year: self.base_year(),
            revenue: self.rows.iter().map(|r| extract_number(&r.revenue)).collect(),
            ebitda: self.rows.iter().map(|r| extract_number(&r.ebitda)).collect(),
            free_cash_flow: self
                .rows
                .iter()
                .map(|r| extract_number(&r.free_cash_flow))
                .collect(),
            cash: extract_number(&self.cash),
            equity: extract_number(&self.equity),
            debt: extract_number(&self.debt),
            equity_rate: parse_unit_rate(&self.equity_rate),
            debt_rate: parse_unit_rate(&self.debt_rate),
            venture_rate: parse_unit_rate(&self.venture_rate),
            market_share: parse_unit_rate(&self.market_share),
            comparable_stock: self.comparable_stock.clone(),
            venture_exit_year: parse_int(&self.venture_exit_year),
        }
    }

    /// Writes every present field of a saved form back into the state.
    ///
    /// Absent fields leave the current value untouched. When `revenue` is
    /// present the row table is first resized to its length, then all three
    /// monetary columns are refilled with separator-formatted text (series
    /// shorter than `revenue` fill the gap with zeros). Rates are restored
    /// as whole-number percent text rounded to the nearest integer.
    pub fn apply_saved(&mut self, saved: &SavedForm) {
        debug!("Restoring saved form fields");
        if let Some(name) = &saved.name {
            self.name = name.clone();
        }
        if let Some(country) = &saved.country {
            self.country_code = country.clone();
        }
        if let Some(year) = saved.data_first_year {
            self.data_first_year = year.to_string();
        }
        if let Some(revenue) = &saved.revenue {
            self.forecast_horizon = revenue.len().to_string();
            self.adjust_rows();
            for (index, row) in self.rows.iter_mut().enumerate() {
                row.revenue = format_amount(revenue.get(index).copied().unwrap_or(0.0));
                row.ebitda = format_amount(series_value(&saved.ebitda, index));
                row.free_cash_flow = format_amount(series_value(&saved.free_cash_flow, index));
            }
        }
        if let Some(cash) = saved.cash {
            self.cash = format_amount(cash);
        }
        if let Some(equity) = saved.equity {
            self.equity = format_amount(equity);
        }
        if let Some(debt) = saved.debt {
            self.debt = format_amount(debt);
        }
        if let Some(rate) = saved.equity_rate {
            self.equity_rate = format_percent(rate);
        }
        if let Some(rate) = saved.debt_rate {
            self.debt_rate = format_percent(rate);
        }
        if let Some(rate) = saved.venture_rate {
            self.venture_rate = format_percent(rate);
        }
        if let Some(share) = saved.market_share {
            self.market_share = format_percent(share);
        }
        if let Some(stock) = &saved.comparable_stock {
            self.comparable_stock = stock.clone();
        }
        if let Some(year) = saved.venture_exit_year {
            self.venture_exit_year = year.to_string();
        }
    }
}

fn series_value(series: &Option<Vec<f64>>, index: usize) -> f64 {
    series
        .as_ref()
        .and_then(|values| values.get(index))
        .copied()
        .unwrap_or(0.0)
}

fn parse_int(text: &str) -> i32 {
    text.trim().parse().unwrap_or(0)
}

fn parse_unit_rate(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(0.0) / 100.0
}

/// Whole-number percent text for a unit rate, e.g. `0.4` -> `"40"`.
pub fn format_percent(rate: f64) -> String {
    ((rate * 100.0).round() as i64).to_string()
}

/// Strips all non-digit characters and parses the rest as a number.
///
/// Empty or fully non-numeric input yields `0`. Negative values are lossy:
/// the minus sign counts as a non-digit and is dropped.
pub fn extract_number(text: &str) -> f64 {
    let digits = NON_DIGIT_REGEX.replace_all(text, "");
    if digits.is_empty() {
        return 0.0;
    }
    digits.parse().unwrap_or(0.0)
}

/// Regroups the digits of a monetary input with a separator every three
/// digits from the right; all non-digit characters are discarded first.
pub fn format_thousands(text: &str) -> String {
    let digits = NON_DIGIT_REGEX.replace_all(text, "");
    group_digits(&digits)
}

/// Display text for a stored monetary amount: rounded to the nearest whole
/// unit, absolute digits grouped with separators (the sign is not shown
/// because the input formatter would drop it anyway).
pub fn format_amount(value: f64) -> String {
    let rounded = if value.is_finite() { value.round() as i64 } else { 0 };
    group_digits(&rounded.unsigned_abs().to_string())
}

fn group_digits(digits: &str) -> String {
    if digits.is_empty() {
        return String::new();
    }
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && index % 3 == offset % 3 {
            grouped.push(THOUSANDS_SEPARATOR);
        }
        grouped.push(ch);
    }
    grouped
}

/// New caret position after reformatting replaced the text.
///
/// The caret moves by the length delta the formatter introduced, clamped to
/// the bounds of the new text. Lengths are counted in UTF-16 code units,
/// the unit browser selection offsets use, so pasted multibyte characters
/// do not skew the delta.
pub fn adjusted_caret(old_caret: u32, old_text: &str, new_text: &str) -> u32 {
    let old_units = old_text.encode_utf16().count() as i64;
    let new_units = new_text.encode_utf16().count() as i64;
    let shifted = old_caret as i64 + new_units - old_units;
    shifted.clamp(0, new_units) as u32
}

/// Why a submission was rejected before any request went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The venture exit year falls outside the financials data period.
    ExitYearOutOfRange {
        exit_year: i32,
        first_year: i32,
        last_year: i32,
    },
    /// A forecast row reports more EBITDA than revenue.
    EbitdaExceedsRevenue { row: usize, year: i32 },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::ExitYearOutOfRange {
                exit_year,
                first_year,
                last_year,
            } => write!(
                f,
                "Exit year ({}) can not exceed financials data period ({}-{})",
                exit_year, first_year, last_year
            ),
            FormError::EbitdaExceedsRevenue { year, .. } => {
                write!(f, "EBITDA can not exceed revenue in {}", year)
            }
        }
    }
}

impl std::error::Error for FormError {}

impl FormError {
    /// Element id of the offending input, used for the invalid marker.
    pub fn field_id(&self) -> String {
        match self {
            FormError::ExitYearOutOfRange { .. } => "ventureExitYear".to_string(),
            FormError::EbitdaExceedsRevenue { row, .. } => format!("r{}c3", row),
        }
    }
}

/// Pre-submission checks; the request is transmitted only when this passes.
pub fn validate_request(request: &ValuationRequest) -> Result<(), FormError> {
    let first_year = request.data_first_year;
    let last_year = request.last_forecast_year();
    if request.venture_exit_year < first_year || request.venture_exit_year > last_year {
        return Err(FormError::ExitYearOutOfRange {
            exit_year: request.venture_exit_year,
            first_year,
            last_year,
        });
    }
    for (index, (revenue, ebitda)) in request.revenue.iter().zip(&request.ebitda).enumerate() {
        if ebitda > revenue {
            return Err(FormError::EbitdaExceedsRevenue {
                row: index + 1,
                year: first_year.saturating_add(index as i32),
            });
        }
    }
    Ok(())
}

/// Strips active content from server-provided report markup.
///
/// The backend response is rendered as HTML but never trusted: script
/// blocks, inline event handlers and `javascript:` URLs are removed before
/// the markup reaches the report area. This is a conservative filter, not
/// an HTML parser.
pub fn sanitize_report(markup: &str) -> String {
    let without_scripts = SCRIPT_BLOCK_REGEX.replace_all(markup, "");
    let without_script_tags = SCRIPT_TAG_REGEX.replace_all(&without_scripts, "");
    let without_handlers = EVENT_HANDLER_REGEX.replace_all(&without_script_tags, "");
    let clean = JS_URL_REGEX.replace_all(&without_handlers, " ${1}=\"\"");
    if clean != markup {
        info!("Removed active content from report markup");
    }
    clean.into_owned()
}

/// Pre-flight for a valuation request: derives the payload, validates it,
/// and persists the form before anything is transmitted.
///
/// On a validation failure nothing is persisted and nothing goes out; the
/// caller surfaces the error and stays idle.
pub fn begin_submission<S: storage::KeyValueStore>(
    store: &S,
    state: &FormState,
    current_report: &str,
) -> Result<ValuationRequest, FormError> {
    let request = state.to_request();
    validate_request(&request)?;
    storage::persist(store, state, current_report);
    Ok(request)
}

/// Finishes a submission with the body the backend returned: sanitizes it,
/// persists it next to the submitted form, and hands it back for
/// rendering. The persisted report always equals the rendered one.
pub fn complete_submission<S: storage::KeyValueStore>(
    store: &S,
    state: &FormState,
    response_body: &str,
) -> String {
    let clean = sanitize_report(response_body);
    storage::persist(store, state, &clean);
    clean
}

/// Wall-clock stamp used in exported report file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

/// File name for an exported report:
/// `{company} valuation report {yyyy-MM-dd HH-mm}.pdf`.
pub fn report_file_name(company: &str, stamp: ReportTimestamp) -> String {
    format!(
        "{} valuation report {:04}-{:02}-{:02} {:02}-{:02}.pdf",
        company, stamp.year, stamp.month, stamp.day, stamp.hour, stamp.minute
    )
}

pub mod storage;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_state() -> FormState {
        let mut state = FormState::with_defaults(2024);
        state.rows[0].revenue = "1,000,000".to_string();
        state.rows[0].ebitda = "250,000".to_string();
        state.rows[0].free_cash_flow = "100,000".to_string();
        state.rows[1].revenue = "2,000,000".to_string();
        state.rows[1].ebitda = "600,000".to_string();
        state.rows[1].free_cash_flow = "300,000".to_string();
        state.rows[2].revenue = "3,500,000".to_string();
        state.rows[2].ebitda = "900,000".to_string();
        state.rows[2].free_cash_flow = "450,000".to_string();
        state.cash = "150,000".to_string();
        state.equity = "500,000".to_string();
        state.debt = "200,000".to_string();
        state.equity_rate = "25".to_string();
        state.debt_rate = "12".to_string();
        state.venture_rate = "40".to_string();
        state.market_share = "1".to_string();
        state.comparable_stock = "ACME".to_string();
        state.venture_exit_year = "2026".to_string();
        state
    }

    #[test]
    fn test_defaults_populate_fields_and_rows() {
        let state = FormState::with_defaults(2024);
        assert_eq!(state.name, defaults::COMPANY_NAME);
        assert_eq!(state.country_code, "KZ");
        assert_eq!(state.data_first_year, "2024");
        assert_eq!(state.venture_rate, "40");
        assert_eq!(state.market_share, "1");
        assert_eq!(state.venture_exit_year, "2024");
        assert_eq!(state.rows.len(), defaults::YEARS_FORECAST);
    }

    #[test]
    fn test_adjust_rows_matches_horizon() {
        let mut state = FormState::with_defaults(2024);
        for horizon in [0usize, 1, 5, 2, 10] {
            state.forecast_horizon = horizon.to_string();
            state.adjust_rows();
            assert_eq!(state.rows.len(), horizon);
        }
    }

    #[test]
    fn test_adjust_rows_garbage_horizon_clears_table() {
        let mut state = FormState::with_defaults(2024);
        state.forecast_horizon = "abc".to_string();
        state.adjust_rows();
        assert!(state.rows.is_empty());
    }

    #[test]
    fn test_year_labels_track_base_year() {
        let mut state = FormState::with_defaults(2024);
        assert_eq!(state.year_label(1), 2024);
        assert_eq!(state.year_label(2), 2025);
        assert_eq!(state.year_label(3), 2026);
        state.data_first_year = "2030".to_string();
        assert_eq!(state.year_label(1), 2030);
    }

    #[test]
    fn test_growing_horizon_keeps_existing_rows() {
        let mut state = sample_state();
        state.forecast_horizon = "5".to_string();
        state.adjust_rows();
        assert_eq!(state.rows.len(), 5);
        assert_eq!(state.rows[0].revenue, "1,000,000");
        assert_eq!(state.rows[2].revenue, "3,500,000");
        assert_eq!(state.rows[3], FinancialRow::default());
        assert_eq!(state.year_label(4), 2027);
        assert_eq!(state.year_label(5), 2028);
    }

    #[test]
    fn test_fresh_rows_hold_literal_zeros() {
        let state = FormState::with_defaults(2024);
        assert!(state
            .rows
            .iter()
            .all(|row| row.revenue == "0" && row.ebitda == "0" && row.free_cash_flow == "0"));

        // an untouched form survives a save/restore cycle unchanged
        let json = serde_json::to_string(&state.to_request()).unwrap();
        let saved: SavedForm = serde_json::from_str(&json).unwrap();
        let mut restored = FormState::with_defaults(2024);
        restored.apply_saved(&saved);
        assert_eq!(restored, state);
    }

    #[test]
    fn test_year_arithmetic_saturates_at_extremes() {
        let mut state = sample_state();
        state.data_first_year = i32::MAX.to_string();
        assert_eq!(state.year_label(1), i32::MAX);
        assert_eq!(state.year_label(3), i32::MAX);

        let request = state.to_request();
        assert_eq!(request.last_forecast_year(), i32::MAX);
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_to_request_converts_percentages_and_currency() {
        let request = sample_state().to_request();
        assert_eq!(request.name, defaults::COMPANY_NAME);
        assert_eq!(request.country, "KZ");
        assert_eq!(request.data_first_year, 2024);
        assert_eq!(request.revenue, vec![1_000_000.0, 2_000_000.0, 3_500_000.0]);
        assert_eq!(request.ebitda, vec![250_000.0, 600_000.0, 900_000.0]);
        assert_eq!(
            request.free_cash_flow,
            vec![100_000.0, 300_000.0, 450_000.0]
        );
        assert_eq!(request.cash, 150_000.0);
        assert_eq!(request.equity_rate, 0.25);
        assert_eq!(request.debt_rate, 0.12);
        assert_eq!(request.venture_rate, 0.40);
        assert_eq!(request.market_share, 0.01);
        assert_eq!(request.venture_exit_year, 2026);
        assert_eq!(request.forecast_horizon(), 3);
    }

    #[test]
    fn test_to_request_degrades_garbage_to_zero() {
        let mut state = sample_state();
        state.cash = "not a number".to_string();
        state.equity_rate = "".to_string();
        state.data_first_year = "soon".to_string();
        let request = state.to_request();
        assert_eq!(request.cash, 0.0);
        assert_eq!(request.equity_rate, 0.0);
        assert_eq!(request.data_first_year, 0);
    }

    #[test]
    fn test_request_serializes_with_wire_names() {
        let json = serde_json::to_string(&sample_state().to_request()).unwrap();
        assert!(json.contains("\"dataFirstYear\":2024"));
        assert!(json.contains("\"freeCashFlow\""));
        assert!(json.contains("\"comparableStock\":\"ACME\""));
        assert!(json.contains("\"ventureExitYear\":2026"));
        assert!(!json.contains("forecastHorizon"));
    }

    #[test]
    fn test_saved_form_round_trip_restores_every_field() {
        let state = sample_state();
        let json = serde_json::to_string(&state.to_request()).unwrap();
        let saved: SavedForm = serde_json::from_str(&json).unwrap();

        let mut restored = FormState::with_defaults(1999);
        restored.apply_saved(&saved);
        assert_eq!(restored, state);
    }

    #[test]
    fn test_apply_saved_partial_touches_only_present_fields() {
        let saved: SavedForm =
            serde_json::from_str(r#"{"name":"Globex","equityRate":0.33}"#).unwrap();
        let mut state = FormState::with_defaults(2024);
        state.apply_saved(&saved);
        assert_eq!(state.name, "Globex");
        assert_eq!(state.equity_rate, "33");
        assert_eq!(state.country_code, "KZ");
        assert_eq!(state.rows.len(), 3);
    }

    #[test]
    fn test_apply_saved_ignores_unknown_legacy_keys() {
        let saved: SavedForm =
            serde_json::from_str(r#"{"name":"Initech","isLeader":true}"#).unwrap();
        let mut state = FormState::with_defaults(2024);
        state.apply_saved(&saved);
        assert_eq!(state.name, "Initech");
    }

    #[test]
    fn test_apply_saved_resizes_rows_to_revenue_length() {
        let saved: SavedForm = serde_json::from_str(
            r#"{"revenue":[1200.0,3400.0,5600.0,7800.0],"ebitda":[100.0],"dataFirstYear":2025}"#,
        )
        .unwrap();
        let mut state = FormState::with_defaults(2024);
        state.apply_saved(&saved);
        assert_eq!(state.forecast_horizon, "4");
        assert_eq!(state.rows.len(), 4);
        assert_eq!(state.rows[0].revenue, "1,200");
        assert_eq!(state.rows[3].revenue, "7,800");
        // series shorter than revenue backfill with zeros
        assert_eq!(state.rows[0].ebitda, "100");
        assert_eq!(state.rows[1].ebitda, "0");
        assert_eq!(state.rows[0].free_cash_flow, "0");
    }

    #[test]
    fn test_format_thousands_groups_from_the_right() {
        assert_eq!(format_thousands(""), "");
        assert_eq!(format_thousands("7"), "7");
        assert_eq!(format_thousands("999"), "999");
        assert_eq!(format_thousands("1000"), "1,000");
        assert_eq!(format_thousands("1234567"), "1,234,567");
        assert_eq!(format_thousands("1,23,4567"), "1,234,567");
        assert_eq!(format_thousands("12a34"), "1,234");
    }

    #[test]
    fn test_format_amount_rounds_and_drops_sign() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(1234567.4), "1,234,567");
        assert_eq!(format_amount(999.5), "1,000");
        assert_eq!(format_amount(-2500.0), "2,500");
        assert_eq!(format_amount(f64::NAN), "0");
    }

    #[test]
    fn test_extract_number_is_lossy_for_negatives() {
        assert_eq!(extract_number("1,234,567"), 1_234_567.0);
        assert_eq!(extract_number("-500"), 500.0);
        assert_eq!(extract_number(""), 0.0);
        assert_eq!(extract_number("n/a"), 0.0);
    }

    #[test]
    fn test_adjusted_caret_shifts_by_length_delta() {
        // caret after the last digit follows the inserted separator
        assert_eq!(adjusted_caret(4, "1000", "1,000"), 5);
        // deleting a digit shrinks the text
        assert_eq!(adjusted_caret(5, "1,000", "100"), 3);
        // caret never escapes the text
        assert_eq!(adjusted_caret(0, "1000", "100"), 0);
        assert_eq!(adjusted_caret(9, "1000", "1,000"), 5);
    }

    #[test]
    fn test_adjusted_caret_counts_utf16_units() {
        // "12€34" is 5 UTF-16 units but 7 bytes; browser carets count units
        assert_eq!(format_thousands("12€34"), "1,234");
        assert_eq!(adjusted_caret(5, "12€34", "1,234"), 5);
    }

    #[test]
    fn test_exit_year_accepted_exactly_inside_period() {
        let mut request = sample_state().to_request();
        for year in 2024..=2026 {
            request.venture_exit_year = year;
            assert_eq!(validate_request(&request), Ok(()));
        }
    }

    #[test]
    fn test_exit_year_rejected_outside_period() {
        let mut request = sample_state().to_request();
        request.venture_exit_year = 2030;
        let err = validate_request(&request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Exit year (2030) can not exceed financials data period (2024-2026)"
        );
        assert_eq!(err.field_id(), "ventureExitYear");

        request.venture_exit_year = 2023;
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_exit_year_always_rejected_with_empty_horizon() {
        let mut request = sample_state().to_request();
        request.revenue.clear();
        request.ebitda.clear();
        request.free_cash_flow.clear();
        request.venture_exit_year = request.data_first_year;
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_ebitda_above_revenue_names_the_year() {
        let mut state = sample_state();
        state.rows[1].ebitda = "9,000,000".to_string();
        let err = validate_request(&state.to_request()).unwrap_err();
        assert_eq!(err.to_string(), "EBITDA can not exceed revenue in 2025");
        assert_eq!(err.field_id(), "r2c3");
    }

    #[test]
    fn test_sanitize_report_strips_active_content() {
        let dirty = "<h5>ACME</h5><script>alert(1)</script>\
                     <table onclick=\"steal()\"><tr><td>1</td></tr></table>\
                     <a href=\"javascript:run()\">x</a>";
        let clean = sanitize_report(dirty);
        assert!(!clean.to_lowercase().contains("<script"));
        assert!(!clean.to_lowercase().contains("onclick"));
        assert!(!clean.to_lowercase().contains("javascript:"));
        assert!(clean.contains("<h5>ACME</h5>"));
        assert!(clean.contains("<td>1</td>"));
    }

    #[test]
    fn test_sanitize_report_keeps_benign_markup_untouched() {
        let report = "<h5>ACME (KZ)</h5><table class=\"table\"><tr>\
                      <td class=\"text-end\">1,000</td></tr></table>";
        assert_eq!(sanitize_report(report), report);
    }

    #[test]
    fn test_report_file_name_pads_timestamp() {
        let stamp = ReportTimestamp {
            year: 2026,
            month: 3,
            day: 7,
            hour: 9,
            minute: 5,
        };
        assert_eq!(
            report_file_name("ACME", stamp),
            "ACME valuation report 2026-03-07 09-05.pdf"
        );
    }

    proptest! {
        #[test]
        fn prop_separator_round_trip(n in 0u64..=1_000_000_000_000) {
            let formatted = format_thousands(&n.to_string());
            prop_assert_eq!(extract_number(&formatted), n as f64);
        }

        #[test]
        fn prop_groups_never_exceed_three_digits(n in 0u64..=u64::MAX) {
            let formatted = format_thousands(&n.to_string());
            for group in formatted.split(THOUSANDS_SEPARATOR) {
                prop_assert!(!group.is_empty() && group.len() <= 3);
            }
        }

        #[test]
        fn prop_adjust_rows_is_exact(h in 0usize..=64) {
            let mut state = FormState::with_defaults(2024);
            state.forecast_horizon = h.to_string();
            state.adjust_rows();
            prop_assert_eq!(state.rows.len(), h);
            for row in 1..=h {
                prop_assert_eq!(state.year_label(row), 2024 + row as i32 - 1);
            }
        }

        #[test]
        fn prop_submission_blocked_iff_exit_year_outside_period(exit in 2000i32..=2050) {
            let mut request = sample_state().to_request();
            request.venture_exit_year = exit;
            let inside = (2024..=2026).contains(&exit);
            prop_assert_eq!(validate_request(&request).is_ok(), inside);
        }
    }
}
