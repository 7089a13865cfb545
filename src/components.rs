//! Pure Yew view components for the valuation form.
//!
//! Stateless components that render from props; all form state lives in
//! the main component.

use crate::config;
use valuator_form::FinancialRow;
use yew::prelude::*;

fn input_classes(invalid: bool) -> Classes {
    if invalid {
        classes!("form-control", "invalid")
    } else {
        classes!("form-control")
    }
}

/// Plain text input with a label.
#[derive(Properties, PartialEq)]
pub struct TextFieldProps {
    pub id: AttrValue,
    pub label: AttrValue,
    pub value: AttrValue,
    pub oninput: Callback<InputEvent>,
}

#[function_component(TextField)]
pub fn text_field(props: &TextFieldProps) -> Html {
    html! {
        <div class="form-group">
            <label for={props.id.clone()}>{ props.label.clone() }</label>
            <input type="text"
                id={props.id.clone()}
                value={props.value.clone()}
                oninput={props.oninput.clone()}
            />
        </div>
    }
}

/// Whole-number input used for years, the forecast horizon and rates.
#[derive(Properties, PartialEq)]
pub struct NumberFieldProps {
    pub id: AttrValue,
    pub label: AttrValue,
    pub value: AttrValue,
    #[prop_or_default]
    pub invalid: bool,
    pub oninput: Callback<InputEvent>,
    /// Fires when the edit is committed, not on every keystroke.
    #[prop_or_default]
    pub onchange: Callback<Event>,
}

#[function_component(NumberField)]
pub fn number_field(props: &NumberFieldProps) -> Html {
    html! {
        <div class="form-group">
            <label for={props.id.clone()}>{ props.label.clone() }</label>
            <input type="number"
                id={props.id.clone()}
                class={input_classes(props.invalid)}
                value={props.value.clone()}
                oninput={props.oninput.clone()}
                onchange={props.onchange.clone()}
            />
        </div>
    }
}

/// Monetary input that regroups its digits while the user types.
///
/// Rendered as a text input so the separator-formatted value survives; the
/// numeric keyboard hint comes from `inputmode`.
#[derive(Properties, PartialEq)]
pub struct CurrencyFieldProps {
    pub id: AttrValue,
    pub label: AttrValue,
    pub value: AttrValue,
    #[prop_or_default]
    pub invalid: bool,
    pub oninput: Callback<InputEvent>,
}

#[function_component(CurrencyField)]
pub fn currency_field(props: &CurrencyFieldProps) -> Html {
    html! {
        <div class="form-group">
            <label for={props.id.clone()}>{ props.label.clone() }</label>
            <input type="text"
                inputmode="numeric"
                id={props.id.clone()}
                class={input_classes(props.invalid)}
                value={props.value.clone()}
                oninput={props.oninput.clone()}
            />
        </div>
    }
}

/// The per-year financials table.
///
/// Row count follows the forecast horizon; column 1 shows the derived year
/// label and columns 2-4 are monetary inputs addressed as `r{row}c{col}`,
/// both 1-based.
#[derive(Properties, PartialEq)]
pub struct FinancialsTableProps {
    pub rows: Vec<FinancialRow>,
    pub base_year: i32,
    #[prop_or_default]
    pub invalid_field: Option<AttrValue>,
    /// Receives `(row, column, event)` for every keystroke in a cell.
    pub oninput: Callback<(usize, usize, InputEvent)>,
}

#[function_component(FinancialsTable)]
pub fn financials_table(props: &FinancialsTableProps) -> Html {
    html! {
        <table id="financials" class="financials-table">
            <thead>
                <tr>
                    <th>{ "Year" }</th>
                    <th>{ "Revenue" }</th>
                    <th>{ "EBITDA" }</th>
                    <th>{ "Free Cash Flow" }</th>
                </tr>
            </thead>
            <tbody>
                { props.rows.iter().enumerate().map(|(index, row)| {
                    render_financials_row(props, index + 1, row)
                }).collect::<Html>() }
            </tbody>
        </table>
    }
}

fn render_financials_row(
    props: &FinancialsTableProps,
    row_number: usize,
    row: &FinancialRow,
) -> Html {
    html! {
        <tr>
            <td class="year-label">{ props.base_year.saturating_add(row_number as i32 - 1) }</td>
            { currency_cell(props, row_number, 2, &row.revenue) }
            { currency_cell(props, row_number, 3, &row.ebitda) }
            { currency_cell(props, row_number, 4, &row.free_cash_flow) }
        </tr>
    }
}

fn currency_cell(
    props: &FinancialsTableProps,
    row_number: usize,
    column: usize,
    value: &str,
) -> Html {
    let id = format!("r{}c{}", row_number, column);
    let invalid = props.invalid_field.as_deref() == Some(id.as_str());
    let oninput = props.oninput.reform(move |event| (row_number, column, event));
    html! {
        <td>
            <input type="text"
                inputmode="numeric"
                id={id}
                class={input_classes(invalid)}
                value={value.to_string()}
                oninput={oninput}
            />
        </td>
    }
}

/// Renders the report markup received from the backend.
///
/// The markup is injected raw, so callers must pass it through the
/// sanitizer first.
#[derive(Properties, PartialEq)]
pub struct ReportPanelProps {
    pub markup: AttrValue,
}

#[function_component(ReportPanel)]
pub fn report_panel(props: &ReportPanelProps) -> Html {
    let content = Html::from_html_unchecked(props.markup.clone());
    html! {
        <div id={config::REPORT_ELEMENT_ID} class="report-area">
            { content }
        </div>
    }
}
