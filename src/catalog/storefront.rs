//! Experiments shipped with the demo storefront

use super::{Experiment, Modification, Variant};

const PRODUCT_BUTTONS: &str = r#"[id^="product-cta-"], [id^="product-add-cart-"]"#;

fn styled(id: &str, name: &str, weight: f64, selector: &str, color: &str) -> Variant {
    Variant::builder(id, name)
        .weight(weight)
        .modification(Modification::style(selector, "backgroundColor", color))
        .build()
}

fn texted(id: &str, name: &str, selector: &str, text: &str) -> Variant {
    Variant::builder(id, name)
        .weight(0.5)
        .modification(Modification::text(selector, text))
        .build()
}

pub(super) fn experiments() -> Vec<Experiment> {
    vec![
        Experiment::builder("hero-cta-colors", "Hero CTA Button Colors")
            .variant(styled("control", "Control (Blue)", 0.5, "#hero-cta-primary", "#2563eb"))
            .variant(styled("variant-a", "Green CTA", 0.5, "#hero-cta-primary", "#059669"))
            .build(),
        Experiment::builder("product-cta-colors", "Product CTA Button Colors")
            .variant(styled("control", "Control (Blue)", 0.33, PRODUCT_BUTTONS, "#2563eb"))
            .variant(styled("variant-a", "Purple CTA", 0.33, PRODUCT_BUTTONS, "#7c3aed"))
            .variant(styled("variant-b", "Red CTA", 0.34, PRODUCT_BUTTONS, "#dc2626"))
            .build(),
        Experiment::builder("checkout-button-text", "Checkout Button Text")
            .variant(texted("control", "Control Text", "#checkout-complete-btn", "Complete Order"))
            .variant(texted(
                "variant-a",
                "Urgency Text",
                "#checkout-complete-btn",
                "Buy Now - Limited Time!",
            ))
            .build(),
        Experiment::builder("headline-text", "Homepage Headline Text")
            .variant(texted("control", "Control Headline", "h1", "Welcome to TestStore"))
            .variant(texted(
                "variant-a",
                "Benefit-Focused Headline",
                "h1",
                "Shop Smarter, Save More at TestStore",
            ))
            .build(),
    ]
}
