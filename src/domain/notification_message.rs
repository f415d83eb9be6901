use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tera::{Context, Tera};

use crate::domain::{DisplayName, SubscriberEmail};

const SUBSCRIBED: &str = "subscribed.html";

// `.html` names get tera's autoescaping.
static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_template(SUBSCRIBED, include_str!("../../templates/subscribed.html"))
        .expect("embedded subscribed template is valid");
    tera
});

/// The "you are subscribed" email, ready to hand to the provider.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub recipient: SubscriberEmail,
    pub subject: String,
    pub body_html: String,
}

impl NotificationMessage {
    pub fn subscribed(recipient: SubscriberEmail, date: NaiveDate) -> Result<Self, tera::Error> {
        let display_name = DisplayName::from_email(&recipient);

        let mut context = Context::new();
        context.insert("display_name", display_name.as_ref());
        context.insert("today", &long_date(date));
        let body_html = TEMPLATES.render(SUBSCRIBED, &context)?;

        Ok(Self {
            subject: format!("Welcome to KAO Global, {}", display_name),
            body_html,
            recipient,
        })
    }
}

/// e.g. "Monday, January 1, 2024"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
