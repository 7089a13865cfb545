//! Main module for the company valuation form using Yew.
//! Wires UI components, state hooks, and side-effect logic.

use log::{debug, info};
use valuator_form::storage::{initialize, persist, BrowserStorage};
use valuator_form::{
    begin_submission, complete_submission, report_file_name, sanitize_report, FormState,
    ValuationRequest,
};
use web_sys::HtmlInputElement;
use yew::prelude::*;

mod components;
mod config;
mod hooks;
mod pdf;
mod utils;

use components::{CurrencyField, FinancialsTable, NumberField, ReportPanel, TextField};
use config::*;
use hooks::use_before_unload;
use utils::format_currency_field;

// ──────────────────────────────────────────────────────────────────────────────
// Helper functions

/// Posts the payload and returns the response body.
///
/// The body comes back whatever the HTTP status: the backend reports its
/// own failures as renderable markup, so only transport-level errors
/// surface as `Err`.
async fn post_valuation(request: &ValuationRequest) -> Result<String, gloo_net::Error> {
    let body = serde_json::to_string(request)?;
    let response = gloo_net::http::Request::post(VALUATE_URL)
        .header("Content-Type", "application/json")
        .body(body)?
        .send()
        .await?;
    response.text().await
}

/// Callback writing the raw input text into one field of the form state.
fn text_input_callback(
    form: &UseStateHandle<FormState>,
    apply: fn(&mut FormState, String),
) -> Callback<InputEvent> {
    let form = form.clone();
    Callback::from(move |event: InputEvent| {
        let input: HtmlInputElement = event.target_unchecked_into();
        let mut next = (*form).clone();
        apply(&mut next, input.value());
        form.set(next);
    })
}

/// Like [`text_input_callback`], but regroups the element's digits with
/// thousands separators before reading the value back.
fn currency_input_callback(
    form: &UseStateHandle<FormState>,
    apply: fn(&mut FormState, String),
) -> Callback<InputEvent> {
    let form = form.clone();
    Callback::from(move |event: InputEvent| {
        let input: HtmlInputElement = event.target_unchecked_into();
        format_currency_field(&input);
        let mut next = (*form).clone();
        apply(&mut next, input.value());
        form.set(next);
    })
}

// ──────────────────────────────────────────────────────────────────────────────

/// Primary application component wiring state, effects, and UI elements.
#[function_component(Main)]
fn main_component() -> Html {
    let form = use_state(|| FormState::with_defaults(utils::current_year()));
    let report = use_state(|| None::<AttrValue>);
    let is_submitting = use_state(|| false);
    let invalid_field = use_state(|| None::<AttrValue>);

    // Live copies read by commit-time persistence and the unload listener;
    // the state handles above only expose the snapshot of the last render.
    let live_form = use_mut_ref(FormState::default);
    let live_report = use_mut_ref(String::new);
    *live_form.borrow_mut() = (*form).clone();
    *live_report.borrow_mut() = (*report)
        .as_ref()
        .map(|markup| markup.to_string())
        .unwrap_or_default();

    // Restore the previous session once on mount
    {
        let form = form.clone();
        let report = report.clone();
        use_effect_with((), move |_| {
            let (state, saved_report) = initialize(&BrowserStorage, utils::current_year());
            form.set(state);
            if let Some(markup) = saved_report.filter(|markup| !markup.is_empty()) {
                report.set(Some(sanitize_report(&markup).into()));
            }
        });
    }

    // Commit-time persistence; change events bubble here from every field
    let on_form_change = {
        let live_form = live_form.clone();
        let live_report = live_report.clone();
        Callback::from(move |_: Event| {
            persist(&BrowserStorage, &live_form.borrow(), &live_report.borrow());
            debug!("Form saved to local storage");
        })
    };

    {
        let live_form = live_form.clone();
        let live_report = live_report.clone();
        use_before_unload(Callback::from(move |_| {
            persist(&BrowserStorage, &live_form.borrow(), &live_report.borrow());
        }));
    }

    // --- OnInput handlers for scalar fields ---
    let on_name_input = text_input_callback(&form, |state, value| state.name = value);
    let on_country_input = text_input_callback(&form, |state, value| state.country_code = value);
    let on_first_year_input =
        text_input_callback(&form, |state, value| state.data_first_year = value);
    let on_horizon_input =
        text_input_callback(&form, |state, value| state.forecast_horizon = value);
    let on_cash_input = currency_input_callback(&form, |state, value| state.cash = value);
    let on_equity_input = currency_input_callback(&form, |state, value| state.equity = value);
    let on_debt_input = currency_input_callback(&form, |state, value| state.debt = value);
    let on_equity_rate_input =
        text_input_callback(&form, |state, value| state.equity_rate = value);
    let on_debt_rate_input = text_input_callback(&form, |state, value| state.debt_rate = value);
    let on_venture_rate_input =
        text_input_callback(&form, |state, value| state.venture_rate = value);
    let on_market_share_input =
        text_input_callback(&form, |state, value| state.market_share = value);
    let on_stock_input = text_input_callback(&form, |state, value| state.comparable_stock = value);
    let on_exit_year_input =
        text_input_callback(&form, |state, value| state.venture_exit_year = value);

    // Grid cells write through by (row, column)
    let on_cell_input = {
        let form = form.clone();
        Callback::from(move |(row, column, event): (usize, usize, InputEvent)| {
            let input: HtmlInputElement = event.target_unchecked_into();
            format_currency_field(&input);
            let mut next = (*form).clone();
            if let Some(cells) = next.rows.get_mut(row - 1) {
                match column {
                    2 => cells.revenue = input.value(),
                    3 => cells.ebitda = input.value(),
                    4 => cells.free_cash_flow = input.value(),
                    _ => {}
                }
            }
            form.set(next);
        })
    };

    // Committing a new base year or horizon resizes the financials table
    let on_period_change = {
        let form = form.clone();
        Callback::from(move |_: Event| {
            let mut next = (*form).clone();
            next.adjust_rows();
            info!(
                "Time period changed: {} till {}",
                next.base_year(),
                next.year_label(next.rows.len())
            );
            form.set(next);
        })
    };

    // Valuate: guard, persist, then one in-flight request
    let on_submit = {
        let report = report.clone();
        let is_submitting = is_submitting.clone();
        let invalid_field = invalid_field.clone();
        let live_form = live_form.clone();
        let live_report = live_report.clone();
        Callback::from(move |event: SubmitEvent| {
            event.prevent_default();
            if *is_submitting {
                return;
            }
            let state = live_form.borrow().clone();
            let request = match begin_submission(&BrowserStorage, &state, &live_report.borrow()) {
                Ok(request) => request,
                Err(err) => {
                    info!("Rejected submission: {err}");
                    invalid_field.set(Some(err.field_id().into()));
                    report.set(Some(
                        format!(r#"<p class="validation-error">{err}</p>"#).into(),
                    ));
                    return;
                }
            };
            invalid_field.set(None);
            report.set(Some(LOADING_MARKUP.into()));
            is_submitting.set(true);

            let report = report.clone();
            let is_submitting = is_submitting.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match post_valuation(&request).await {
                    Ok(markup) => {
                        let clean = complete_submission(&BrowserStorage, &state, &markup);
                        report.set(Some(clean.into()));
                    }
                    Err(err) => {
                        report.set(Some(
                            format!(
                                r#"<p class="fetch-error">Request to {VALUATE_URL} failed: {err}</p>"#
                            )
                            .into(),
                        ));
                    }
                }
                is_submitting.set(false);
            });
        })
    };

    // Export reads the live company name so unblurred edits still count
    let on_export = {
        let live_form = live_form.clone();
        Callback::from(move |_: MouseEvent| {
            let file_name = report_file_name(&live_form.borrow().name, utils::now_timestamp());
            info!("Exporting report as {file_name}");
            pdf::export_report(&file_name);
        })
    };

    let report_markup = match &*report {
        Some(markup) => markup.clone(),
        None => AttrValue::from(EMPTY_REPORT_MARKUP),
    };
    let exit_year_invalid = (*invalid_field).as_deref() == Some("ventureExitYear");

    html! {
        <div class="container">
            <h1>{ "Private Company Valuator" }</h1>

            <form id="form" onsubmit={on_submit} onchange={on_form_change}>
                <div class="form-row">
                    <TextField id="name" label="Company name:"
                        value={form.name.clone()} oninput={on_name_input} />
                    <TextField id="countryCode" label="Country code:"
                        value={form.country_code.clone()} oninput={on_country_input} />
                </div>

                <div class="form-row">
                    <NumberField id="dataFirstYear" label="Data first year:"
                        value={form.data_first_year.clone()}
                        oninput={on_first_year_input}
                        onchange={on_period_change.clone()} />
                    <NumberField id="forecastHorizon" label="Forecast horizon (years):"
                        value={form.forecast_horizon.clone()}
                        oninput={on_horizon_input}
                        onchange={on_period_change} />
                </div>

                <FinancialsTable
                    rows={(*form).rows.clone()}
                    base_year={form.base_year()}
                    invalid_field={(*invalid_field).clone()}
                    oninput={on_cell_input} />

                <div class="form-row">
                    <CurrencyField id="cash" label="Cash:"
                        value={form.cash.clone()} oninput={on_cash_input} />
                    <CurrencyField id="equity" label="Equity:"
                        value={form.equity.clone()} oninput={on_equity_input} />
                    <CurrencyField id="debt" label="Debt:"
                        value={form.debt.clone()} oninput={on_debt_input} />
                </div>

                <div class="form-row">
                    <NumberField id="equityCost" label="Equity cost (%):"
                        value={form.equity_rate.clone()} oninput={on_equity_rate_input} />
                    <NumberField id="debtCost" label="Debt cost (%):"
                        value={form.debt_rate.clone()} oninput={on_debt_rate_input} />
                </div>

                <div class="form-row">
                    <NumberField id="ventureCost" label="Venture rate (%):"
                        value={form.venture_rate.clone()} oninput={on_venture_rate_input} />
                    <NumberField id="marketShare" label="Market share (%):"
                        value={form.market_share.clone()} oninput={on_market_share_input} />
                </div>

                <div class="form-row">
                    <TextField id="comparableStock" label="Comparable stock:"
                        value={form.comparable_stock.clone()} oninput={on_stock_input} />
                    <NumberField id="ventureExitYear" label="Venture exit year:"
                        value={form.venture_exit_year.clone()}
                        invalid={exit_year_invalid}
                        oninput={on_exit_year_input} />
                </div>

                <div class="actions">
                    <button type="submit" id="valuate" disabled={*is_submitting}>
                        { if *is_submitting { "Valuating..." } else { "Valuate" } }
                    </button>
                    <button type="button" id="exportPdf" class="btn-secondary" onclick={on_export}>
                        { "Save as PDF" }
                    </button>
                </div>
            </form>

            <ReportPanel markup={report_markup} />
        </div>
    }
}

/// App wrapper around the main component.
#[function_component]
pub fn App() -> Html {
    html! {
        <Main />
    }
}

/// Entry point: installs the panic hook and mounts the Yew renderer.
fn main() {
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}
