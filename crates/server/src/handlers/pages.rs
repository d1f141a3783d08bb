use askama::Template;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use splatkit::{ColorScheme, OptionalUser};

use crate::state::{AppState, AppUser, LoginLink};

/// Template wrapper that converts Askama templates into HTML responses.
struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to render template");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    color_scheme: ColorScheme,
    next_scheme: ColorScheme,
    user: Option<AppUser>,
    logout_route: String,
    theme_route: String,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    color_scheme: ColorScheme,
    links: &'a [LoginLink],
    return_to: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct LoginQuery {
    pub return_to: Option<String>,
}

/// Handler for the index page (GET /).
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser<AppUser>,
    headers: HeaderMap,
) -> Response {
    let color_scheme = state.theme.get(&headers).await.color_scheme;

    HtmlTemplate(IndexTemplate {
        color_scheme,
        next_scheme: color_scheme.toggled(),
        user,
        logout_route: state.auth.logout_route().to_string(),
        theme_route: state.theme.set_route().to_string(),
    })
    .into_response()
}

/// Handler for GET /login
///
/// - Unauthenticated: renders one form per registered provider
/// - Authenticated: redirects to the index page
pub async fn login(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser<AppUser>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    let color_scheme = state.theme.get(&headers).await.color_scheme;

    HtmlTemplate(LoginTemplate {
        color_scheme,
        links: &state.login_links,
        return_to: query.return_to,
    })
    .into_response()
}
