use std::sync::OnceLock;
use tera::Tera;

pub const PREVIEW_TEMPLATE: &str = "certificate_preview.html";

static TERA: OnceLock<Tera> = OnceLock::new();

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_template(
            PREVIEW_TEMPLATE,
            include_str!("../templates/certificate_preview.html"),
        )
        .expect("Failed to load templates");
        tera
    })
}
