use std::borrow::Cow;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::models::EntityId;

/// Characters escaped when an id is written into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Destinations the navigation guard knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Signup,
    Login,
    AddItem,
    EditItem { id: EntityId },
    ItemDetail { id: EntityId },
    /// `None` is the signed-in user's own profile.
    Profile { id: Option<EntityId> },
    Tags,
}

impl Route {
    /// Parse a path such as `/edit/42`. Query strings and fragments are
    /// ignored and segments are percent-decoded. Unknown paths and segments
    /// that do not decode to UTF-8 yield `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8().ok())
            .collect::<Option<Vec<Cow<'_, str>>>>()?;
        let segments: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["signup"] => Route::Signup,
            ["login"] => Route::Login,
            ["add"] => Route::AddItem,
            ["edit", id] => Route::EditItem { id: (*id).into() },
            ["item", id] => Route::ItemDetail { id: (*id).into() },
            ["profile"] => Route::Profile { id: None },
            ["profile", id] => Route::Profile {
                id: Some((*id).into()),
            },
            ["tags"] => Route::Tags,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Login => "/login".to_string(),
            Route::AddItem => "/add".to_string(),
            Route::EditItem { id } => format!("/edit/{}", segment(id)),
            Route::ItemDetail { id } => format!("/item/{}", segment(id)),
            Route::Profile { id: None } => "/profile".to_string(),
            Route::Profile { id: Some(id) } => format!("/profile/{}", segment(id)),
            Route::Tags => "/tags".to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Signup => "Signup",
            Route::Login => "Login",
            Route::AddItem => "AddItem",
            Route::EditItem { .. } => "EditItem",
            Route::ItemDetail { .. } => "ItemDetail",
            Route::Profile { .. } => "Profile",
            Route::Tags => "Tags",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Tags)
    }

    pub fn requires_auth(&self) -> bool {
        match self {
            Route::AddItem | Route::EditItem { .. } | Route::Tags => true,
            Route::Profile { id } => id.is_none(),
            Route::Home | Route::Signup | Route::Login | Route::ItemDetail { .. } => false,
        }
    }

    /// Pages that only make sense for anonymous visitors.
    pub fn is_auth_page(&self) -> bool {
        matches!(self, Route::Signup | Route::Login)
    }
}

fn segment(id: &EntityId) -> impl fmt::Display + '_ {
    utf8_percent_encode(id.as_str(), SEGMENT)
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
