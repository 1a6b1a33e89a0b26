//! Form components: generic builders plus the login and compose forms.

use maud::{html, Markup, Render};

use crate::constants::MAX_POST_LENGTH;

/// A form container element.
#[derive(Debug)]
pub struct Form<'a> {
    /// Form action URL
    pub action: &'a str,
    /// HTTP method ("get" or "post")
    pub method: &'a str,
    /// Form content (inputs, buttons, etc.)
    pub content: Markup,
    /// Optional CSS class
    pub class: Option<&'a str>,
}

impl<'a> Form<'a> {
    #[must_use]
    pub fn new(action: &'a str, method: &'a str, content: Markup) -> Self {
        Self {
            action,
            method,
            content,
            class: None,
        }
    }

    /// Create a POST form.
    #[must_use]
    pub fn post(action: &'a str, content: Markup) -> Self {
        Self::new(action, "post", content)
    }

    #[must_use]
    pub fn class(mut self, class: &'a str) -> Self {
        self.class = Some(class);
        self
    }
}

impl Render for Form<'_> {
    fn render(&self) -> Markup {
        html! {
            form action=(self.action) method=(self.method) class=[self.class] {
                (self.content)
            }
        }
    }
}

/// An input element.
#[derive(Debug, Clone)]
pub struct Input<'a> {
    pub name: &'a str,
    /// Input type ("text", "password", "hidden", etc.)
    pub r#type: &'a str,
    pub value: Option<&'a str>,
    pub placeholder: Option<&'a str>,
    pub required: bool,
    pub autocomplete: Option<&'a str>,
}

impl<'a> Input<'a> {
    #[must_use]
    pub fn new(name: &'a str, r#type: &'a str) -> Self {
        Self {
            name,
            r#type,
            value: None,
            placeholder: None,
            required: false,
            autocomplete: None,
        }
    }

    #[must_use]
    pub fn text(name: &'a str) -> Self {
        Self::new(name, "text")
    }

    #[must_use]
    pub fn password(name: &'a str) -> Self {
        Self::new(name, "password")
    }

    /// Create a hidden input with a value.
    #[must_use]
    pub fn hidden(name: &'a str, value: &'a str) -> Self {
        Self::new(name, "hidden").value(value)
    }

    #[must_use]
    pub fn value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn autocomplete(mut self, autocomplete: &'a str) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }
}

impl Render for Input<'_> {
    fn render(&self) -> Markup {
        html! {
            input
                type=(self.r#type)
                name=(self.name)
                id=(self.name)
                value=[self.value]
                placeholder=[self.placeholder]
                autocomplete=[self.autocomplete]
                required[self.required];
        }
    }
}

/// Login form for a handle and app password.
#[derive(Debug, Clone, Default)]
pub struct LoginForm<'a> {
    /// Identifier to prefill after a failed attempt.
    pub identifier: Option<&'a str>,
}

impl Render for LoginForm<'_> {
    fn render(&self) -> Markup {
        let mut identifier = Input::text("identifier")
            .placeholder("alice.bsky.social")
            .autocomplete("username")
            .required();
        if let Some(value) = self.identifier {
            identifier = identifier.value(value);
        }
        let content = html! {
            label for="identifier" { "Handle or email" }
            (identifier)
            label for="password" { "App password" }
            (Input::password("password").autocomplete("current-password").required())
            button type="submit" { "Log in" }
        };
        Form::post("/login", content).class("login-form").render()
    }
}

/// Composer for a new plain-text post.
#[derive(Debug, Clone, Default)]
pub struct ComposeForm<'a> {
    /// Text to restore after a rejected submission.
    pub text: Option<&'a str>,
}

impl Render for ComposeForm<'_> {
    fn render(&self) -> Markup {
        let content = html! {
            textarea
                name="text"
                id="text"
                rows="3"
                maxlength=(MAX_POST_LENGTH)
                placeholder="What's up?"
                required
            {
                @if let Some(text) = self.text { (text) }
            }
            button type="submit" { "Post" }
        };
        Form::post("/compose", content).class("compose-form").render()
    }
}
