//! Template placeholder substitution.

use regex::{Captures, Regex};
use std::collections::HashMap;

/// Values available to `{placeholder}` substitution for a single message.
///
/// Patient fields are always present; appointment fields are only set when
/// the message references an appointment. `variables` carries arbitrary
/// template-defined values.
#[derive(Debug, Default, Clone)]
pub struct TemplateContext {
    pub first_name: String,
    pub last_name: String,
    pub appointment_title: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub variables: HashMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn for_patient(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            ..Self::default()
        }
    }
}

/// Substitute `{placeholder}` occurrences from the context.
///
/// Placeholders without a value are left verbatim so a missing appointment
/// context is visible in the rendered message instead of silently blank.
#[must_use]
pub fn render(content: &str, ctx: &TemplateContext) -> String {
    let Ok(re) = Regex::new(r"\{([A-Za-z0-9_]+)\}") else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &Captures| {
        let key = &caps[1];
        lookup(key, ctx).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn lookup(key: &str, ctx: &TemplateContext) -> Option<String> {
    match key {
        "firstName" => Some(ctx.first_name.clone()),
        "lastName" => Some(ctx.last_name.clone()),
        "fullName" => Some(format!("{} {}", ctx.first_name, ctx.last_name)),
        "appointmentTitle" => ctx.appointment_title.clone(),
        "appointmentDate" => ctx.appointment_date.clone(),
        "appointmentTime" => ctx.appointment_time.clone(),
        other => ctx.variables.get(other).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_patient_fields() {
        let ctx = TemplateContext::for_patient("Jane", "Doe");
        assert_eq!(
            render("Hi {firstName} {lastName}, this is {fullName}", &ctx),
            "Hi Jane Doe, this is Jane Doe"
        );
    }

    #[test]
    fn missing_appointment_context_stays_verbatim() {
        let ctx = TemplateContext::for_patient("Jane", "Doe");
        assert_eq!(
            render("Hi {firstName}, see you {appointmentDate}", &ctx),
            "Hi Jane, see you {appointmentDate}"
        );
    }

    #[test]
    fn appointment_fields_substitute_when_present() {
        let mut ctx = TemplateContext::for_patient("Jane", "Doe");
        ctx.appointment_title = Some("Annual checkup".to_string());
        ctx.appointment_date = Some("Monday, January 5, 2026".to_string());
        ctx.appointment_time = Some("2:30 PM".to_string());
        assert_eq!(
            render(
                "{appointmentTitle} on {appointmentDate} at {appointmentTime}",
                &ctx
            ),
            "Annual checkup on Monday, January 5, 2026 at 2:30 PM"
        );
    }

    #[test]
    fn template_variables_substitute() {
        let mut ctx = TemplateContext::for_patient("Jane", "Doe");
        ctx.variables
            .insert("clinicName".to_string(), "Westside Clinic".to_string());
        assert_eq!(
            render("Call {clinicName} to confirm", &ctx),
            "Call Westside Clinic to confirm"
        );
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let ctx = TemplateContext::for_patient("Jane", "Doe");
        assert_eq!(render("Ref {unknownKey}", &ctx), "Ref {unknownKey}");
    }

    #[test]
    fn plain_content_is_untouched() {
        let ctx = TemplateContext::default();
        assert_eq!(render("No placeholders here", &ctx), "No placeholders here");
    }
}
