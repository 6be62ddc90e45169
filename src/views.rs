use axum::response::Html;
use axum_extra::extract::cookie::CookieJar;
use tera::{Context, Tera};

use crate::{error::AppError, flash};

macro_rules! template {
    ($name:literal) => {
        ($name, include_str!(concat!("../templates/", $name)))
    };
}

/// Compiled page templates.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            template!("base.html"),
            template!("404.html"),
            template!("posts/homepage.html"),
            template!("posts/new.html"),
            template!("posts/show.html"),
            template!("posts/edit.html"),
            template!("users/index.html"),
            template!("users/new.html"),
            template!("users/show.html"),
            template!("users/edit.html"),
            template!("tags/index.html"),
            template!("tags/new.html"),
            template!("tags/show.html"),
            template!("tags/edit.html"),
        ])?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<Html<String>, AppError> {
        Ok(Html(self.tera.render(name, context)?))
    }

    /// Renders a full page, consuming any pending notice.
    pub fn page(
        &self,
        name: &str,
        jar: CookieJar,
        mut context: Context,
    ) -> Result<(CookieJar, Html<String>), AppError> {
        let (jar, notice) = flash::take_notice(jar);
        context.insert("notice", &notice);
        let html = self.render(name, &context)?;
        Ok((jar, html))
    }

    pub fn not_found(&self) -> Result<Html<String>, AppError> {
        let mut context = Context::new();
        context.insert("notice", &None::<String>);
        self.render("404.html", &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_compile() {
        let views = Views::new().unwrap();
        let names: Vec<&str> = views.tera.get_template_names().collect();
        assert!(names.contains(&"users/index.html"));
        assert!(names.contains(&"404.html"));
    }

    #[test]
    fn not_found_page_renders() {
        let views = Views::new().unwrap();
        let Html(body) = views.not_found().unwrap();
        assert!(body.contains("Page Not Found"));
    }

    #[test]
    fn page_shows_and_escapes_notice() {
        let views = Views::new().unwrap();
        let jar = flash::set_notice(CookieJar::new(), "Tag '<b>' added.");
        let mut context = Context::new();
        context.insert("users", &Vec::<String>::new());

        let (_, Html(body)) = views.page("users/index.html", jar, context).unwrap();
        assert!(body.contains("&lt;b&gt;"));
        assert!(!body.contains("<b>"));
    }
}
