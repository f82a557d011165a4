use super::handlers::{
    analytics, appointments, auth, communications, health, patients, settings, templates, users,
    webhooks,
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec. Handlers sharing a path must
/// share a `routes!` call. Routes added outside (like `/` or `OPTIONS
/// /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::login))
        .routes(routes!(auth::logout))
        .routes(routes!(auth::validate))
        .routes(routes!(patients::list_patients, patients::create_patient))
        .routes(routes!(
            patients::get_patient,
            patients::update_patient,
            patients::delete_patient
        ))
        .routes(routes!(patients::import_patients))
        .routes(routes!(
            appointments::list_appointments,
            appointments::create_appointment
        ))
        .routes(routes!(
            appointments::get_appointment,
            appointments::update_appointment,
            appointments::delete_appointment
        ))
        .routes(routes!(
            templates::list_templates,
            templates::create_template
        ))
        .routes(routes!(
            templates::get_template,
            templates::update_template,
            templates::delete_template
        ))
        .routes(routes!(
            communications::list_communications,
            communications::send_communication
        ))
        .routes(routes!(communications::send_sms))
        .routes(routes!(communications::send_voice))
        .routes(routes!(users::list_users, users::create_user))
        .routes(routes!(
            users::get_user,
            users::update_user,
            users::delete_user
        ))
        .routes(routes!(settings::get_settings, settings::update_settings))
        .routes(routes!(webhooks::twilio_status))
        .routes(routes!(analytics::summary))
}

fn tags() -> Vec<Tag> {
    [
        ("auth", "Login, logout and credential validation"),
        ("patients", "Patient records and CSV import"),
        ("appointments", "Appointment scheduling"),
        ("templates", "Reusable message templates"),
        ("communications", "Outbound SMS and voice dispatch"),
        ("users", "Staff account administration"),
        ("settings", "Messaging mode toggle"),
        ("webhooks", "Provider delivery callbacks"),
        ("analytics", "Dashboard counters"),
        ("system", "Health and metadata"),
    ]
    .into_iter()
    .map(|(name, description)| {
        let mut tag = Tag::new(name);
        tag.description = Some(description.to_string());
        tag
    })
    .collect()
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    // Tags go on the seed document; the router only appends paths to it.
    OpenApiBuilder::new().info(info).tags(Some(tags())).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "patients"));
        assert!(tags.iter().any(|tag| tag.name == "communications"));
        assert!(spec.paths.paths.contains_key("/auth/login"));
        assert!(spec.paths.paths.contains_key("/patients/{id}"));
        assert!(spec.paths.paths.contains_key("/communications/sms"));
        assert!(spec.paths.paths.contains_key("/webhooks/twilio"));
        assert!(spec.paths.paths.contains_key("/analytics/summary"));
    }
}
