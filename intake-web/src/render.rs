//! HTML rendering for the outbound email and the response pages.
//!
//! Every user-supplied value passes through [`escape_html`] before it is
//! placed into markup.

use chrono::{DateTime, Utc};

use crate::submission::ApplicantDetails;

/// Timestamp format shown on the confirmation page.
pub const TIMESTAMP_FORMAT: &str = "%d %b %Y, %H:%M:%S UTC";

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Subject line of the application email. Plain text, not HTML.
pub fn email_subject(applicant: &ApplicantDetails) -> String {
    format!("New Loan Application - {}", applicant.name)
}

/// HTML body of the application email.
pub fn email_body(applicant: &ApplicantDetails) -> String {
    format!(
        "<h3>Loan Application</h3>\n\
         <p>Name: {}</p>\n\
         <p>Mobile: {}</p>\n\
         <p>DOB: {}</p>\n\
         <p>Employment: {}</p>\n\
         <p>Income: \u{20b9}{}</p>\n",
        escape_html(&applicant.name),
        escape_html(&applicant.mobile),
        escape_html(&applicant.dob),
        escape_html(&applicant.employment),
        escape_html(&applicant.income),
    )
}

/// Details shown back to the applicant after a successful submission.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub name: String,
    pub mobile: String,
    pub submitted_at: DateTime<Utc>,
}

impl Confirmation {
    pub fn new(applicant: &ApplicantDetails, submitted_at: DateTime<Utc>) -> Self {
        Self {
            name: applicant.name.clone(),
            mobile: applicant.mobile.clone(),
            submitted_at,
        }
    }
}

/// Success page.
pub fn confirmation_page(confirmation: &Confirmation) -> String {
    let body = format!(
        "<h1>Thank you, {name}!</h1>\n\
         <p>Your loan application has been received.</p>\n\
         <p>We will contact you on <strong>{mobile}</strong> shortly.</p>\n\
         <p class=\"meta\">Submitted on {submitted}</p>\n\
         <p><a href=\"/apply.html\">Submit another application</a></p>",
        name = escape_html(&confirmation.name),
        mobile = escape_html(&confirmation.mobile),
        submitted = confirmation.submitted_at.format(TIMESTAMP_FORMAT),
    );
    page("Application Received", &body)
}

/// Generic failure page. Carries no detail about the cause.
pub fn error_page() -> String {
    page(
        "Submission Failed",
        "<h1>Something went wrong</h1>\n\
         <p>We could not process your application right now. Please try again later.</p>\n\
         <p><a href=\"/apply.html\">Back to the application form</a></p>",
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} | Hanuman Finance</title>\n\
         <style>body{{font-family:sans-serif;max-width:36rem;margin:3rem auto;padding:0 1rem}}.meta{{color:#666}}</style>\n\
         </head>\n\
         <body>\n\
         {body}\n\
         </body>\n\
         </html>\n",
        title = escape_html(title),
    )
}
