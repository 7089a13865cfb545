use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use yew::prelude::*;

/// Runs the callback when the window fires `beforeunload`.
///
/// The listener is registered once on mount and removed when the component
/// unmounts. The callback is captured at registration time, so it should
/// read live data through a shared handle rather than own a snapshot.
#[hook]
pub fn use_before_unload(on_unload: Callback<()>) {
    use_effect_with((), move |_| {
        let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            on_unload.emit(());
        });
        let window = gloo_utils::window();
        if let Err(err) = window
            .add_event_listener_with_callback("beforeunload", listener.as_ref().unchecked_ref())
        {
            log::warn!("Failed to attach beforeunload listener: {err:?}");
        }
        move || {
            let _ = window.remove_event_listener_with_callback(
                "beforeunload",
                listener.as_ref().unchecked_ref(),
            );
        }
    });
}
