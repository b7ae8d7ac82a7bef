use web_sys as web;

const INTRO_OVERLAY_ID: &str = "intro-overlay";

#[inline]
pub fn show(document: &web::Document) {
    if let Some(el) = document.get_element_by_id(INTRO_OVERLAY_ID) {
        let _ = el.class_list().remove_1("hidden");
        // fallback for pages without the CSS class
        let _ = el.set_attribute("style", "");
    }
}

#[inline]
pub fn hide(document: &web::Document) {
    if let Some(el) = document.get_element_by_id(INTRO_OVERLAY_ID) {
        let _ = el.class_list().add_1("hidden");
        let _ = el.set_attribute("style", "display:none");
    }
}

#[inline]
pub fn is_hidden(document: &web::Document) -> bool {
    document
        .get_element_by_id(INTRO_OVERLAY_ID)
        .map(|el| {
            el.class_list().contains("hidden")
                || el
                    .get_attribute("style")
                    .map(|s| s.contains("display:none"))
                    .unwrap_or(false)
        })
        .unwrap_or(true)
}
