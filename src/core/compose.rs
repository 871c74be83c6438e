use std::fmt::Write as _;

use crate::models::Notice;
use crate::services::email::EmailMessage;

pub const DEFAULT_SUBJECT: &str = "Nová oznámení na úřední desce KHK";
pub const DEFAULT_FOOTER: &str = "Toto je automatická zpráva z úřední desky Královéhradeckého kraje.";

/// Renders the daily alert email for one user
#[derive(Debug, Clone)]
pub struct EmailComposer {
    public_base_url: String,
    subject: String,
    footer: String,
}

impl EmailComposer {
    pub fn new(
        public_base_url: impl Into<String>,
        subject: impl Into<String>,
        footer: impl Into<String>,
    ) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            subject: subject.into(),
            footer: footer.into(),
        }
    }

    /// Deep link to the notice detail page
    ///
    /// The detail page looks notices up by feed position. Notices that did not come
    /// from the feed are linked by their url-encoded id instead.
    pub fn detail_url(&self, notice: &Notice) -> String {
        match notice.board_index {
            Some(index) => format!("{}/detail/{}", self.public_base_url, index),
            None => format!(
                "{}/detail/{}",
                self.public_base_url,
                urlencoding::encode(&notice.id)
            ),
        }
    }

    /// Build the message for a non-empty list of matched notices
    pub fn compose(&self, recipient: &str, notices: &[&Notice]) -> EmailMessage {
        EmailMessage {
            recipients: vec![recipient.to_string()],
            subject: self.subject.clone(),
            text: self.render_text(notices),
            html: self.render_html(notices),
        }
    }

    fn render_text(&self, notices: &[&Notice]) -> String {
        let mut text = format!(
            "Na úřední desce se objevilo {} nových oznámení odpovídajících vašim preferencím.\n",
            notices.len()
        );

        for notice in notices {
            let _ = write!(
                text,
                "\n- {}\n  Kategorie: {}\n  Vyvěšeno: {}\n",
                notice.title,
                notice.category,
                notice.publication_date.as_deref().unwrap_or("-"),
            );
            if let Some(place) = &notice.place {
                let _ = writeln!(text, "  Lokace: {}", place);
            }
            if let Some(score) = notice.relevance_score {
                let _ = writeln!(text, "  Relevance: {}", relevance_percent(score));
            }
            let _ = writeln!(text, "  Detail: {}", self.detail_url(notice));
        }

        let _ = write!(text, "\n{}\n", self.footer);
        text
    }

    fn render_html(&self, notices: &[&Notice]) -> String {
        let cards: String = notices.iter().map(|notice| self.render_card(notice)).collect();

        format!(
            r#"<div style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; background-color: #f4f4f4; margin: 0; padding: 0;">
  <table cellpadding="0" cellspacing="0" style="width: 100%; max-width: 600px; margin: 20px auto; background-color: #ffffff; border-radius: 8px;">
    <tr>
      <td style="padding: 40px 30px; text-align: center; background-color: #0a2f83;">
        <h1 style="color: #ffffff; margin: 0; font-size: 28px;">Nová oznámení</h1>
      </td>
    </tr>
    <tr>
      <td style="padding: 30px;">
        <p style="margin-bottom: 20px;">Vážený uživateli,</p>
        <p style="margin-bottom: 20px;">na úřední desce se objevila nová oznámení odpovídající vašim preferencím:</p>
        {cards}
      </td>
    </tr>
    <tr>
      <td style="padding: 20px; background-color: #f0f7ff; text-align: center; font-size: 14px; color: #666;">
        <p style="margin: 0;">{footer}</p>
        <p style="margin: 5px 0 0 0;">Nastavení oznámení můžete spravovat ve svém účtu.</p>
      </td>
    </tr>
  </table>
</div>"#,
            cards = cards,
            footer = html_escape(&self.footer),
        )
    }

    fn render_card(&self, notice: &Notice) -> String {
        let url = html_escape(&self.detail_url(notice));
        let place = notice
            .place
            .as_deref()
            .map(|place| {
                format!(
                    r#"<p style="margin: 5px 0; font-size: 14px;"><strong>Lokace:</strong> {}</p>"#,
                    html_escape(place)
                )
            })
            .unwrap_or_default();
        let relevance = notice
            .relevance_score
            .map(|score| {
                format!(
                    r#"<p style="margin: 5px 0; font-size: 14px;"><strong>Relevance:</strong> {}</p>"#,
                    relevance_percent(score)
                )
            })
            .unwrap_or_default();

        format!(
            r#"
        <div style="margin-bottom: 20px; padding: 15px; background-color: #f9fafb; border-left: 4px solid #0a2f83;">
          <h3 style="margin: 0 0 10px 0; font-size: 18px;"><a href="{url}" style="color: #0a2f83; text-decoration: none;">{title}</a></h3>
          <p style="margin: 5px 0; font-size: 14px;"><strong>Kategorie:</strong> {category}</p>
          <p style="margin: 5px 0; font-size: 14px;"><strong>Vyvěšeno:</strong> {date}</p>
          {place}
          {relevance}
          <p style="margin: 10px 0 0 0;"><a href="{url}" style="display: inline-block; background-color: #0a2f83; color: #ffffff; text-decoration: none; padding: 8px 16px; border-radius: 4px; font-size: 14px; font-weight: bold;">Zobrazit detail</a></p>
        </div>"#,
            url = url,
            title = html_escape(&notice.title),
            category = html_escape(notice.category.label()),
            date = html_escape(notice.publication_date.as_deref().unwrap_or("-")),
            place = place,
            relevance = relevance,
        )
    }
}

impl Default for EmailComposer {
    fn default() -> Self {
        Self::new("http://localhost:5173", DEFAULT_SUBJECT, DEFAULT_FOOTER)
    }
}

fn relevance_percent(score: f64) -> String {
    format!("{:.0} %", score.clamp(0.0, 1.0) * 100.0)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Coordinates};

    fn notice(id: &str, title: &str) -> Notice {
        Notice {
            id: id.to_string(),
            category: Category::Transport,
            publication_date: Some("2024-01-02".to_string()),
            coordinates: Some(Coordinates::new(50.2, 15.8)),
            title: title.to_string(),
            url: "https://www.khk.cz/uredni-deska/1".to_string(),
            place: Some("Trutnov".to_string()),
            relevance_score: None,
            board_index: None,
        }
    }

    #[test]
    fn test_compose_includes_every_notice() {
        let composer = EmailComposer::new("https://deska.example.cz/", DEFAULT_SUBJECT, DEFAULT_FOOTER);
        let a = notice("7", "Uzavírka silnice II/300");
        let b = notice("8", "Oprava mostu");

        let message = composer.compose("user@example.com", &[&a, &b]);

        assert_eq!(message.recipients, vec!["user@example.com"]);
        assert_eq!(message.subject, DEFAULT_SUBJECT);
        assert!(message.text.contains("objevilo 2 nových"));
        for body in [&message.text, &message.html] {
            assert!(body.contains("Uzavírka silnice II/300"));
            assert!(body.contains("Oprava mostu"));
            assert!(body.contains("Veřejná Doprava A Silnice"));
            assert!(body.contains("2024-01-02"));
            assert!(body.contains("https://deska.example.cz/detail/7"));
            assert!(body.contains("Trutnov"));
        }
    }

    #[test]
    fn test_html_is_escaped() {
        let composer = EmailComposer::default();
        let n = notice("1", "<script>alert('x')</script> & co");

        let message = composer.compose("user@example.com", &[&n]);

        assert!(!message.html.contains("<script>"));
        assert!(message.html.contains("&lt;script&gt;"));
        assert!(message.html.contains("&amp; co"));
    }

    #[test]
    fn test_detail_url_uses_board_index() {
        let composer = EmailComposer::new("https://deska.example.cz", DEFAULT_SUBJECT, DEFAULT_FOOTER);
        let mut n = notice("https://www.khk.cz/deska/1", "x");
        n.board_index = Some(17);

        assert_eq!(composer.detail_url(&n), "https://deska.example.cz/detail/17");
    }

    #[test]
    fn test_detail_url_without_index_encodes_identifier() {
        let composer = EmailComposer::new("https://deska.example.cz", DEFAULT_SUBJECT, DEFAULT_FOOTER);
        let n = notice("https://www.khk.cz/deska/1", "x");

        assert_eq!(
            composer.detail_url(&n),
            "https://deska.example.cz/detail/https%3A%2F%2Fwww.khk.cz%2Fdeska%2F1"
        );
    }

    #[test]
    fn test_relevance_is_shown_when_scored() {
        let composer = EmailComposer::default();
        let mut scored = notice("1", "Hodnocené");
        scored.relevance_score = Some(0.734);
        let unscored = notice("2", "Bez hodnocení");

        let message = composer.compose("user@example.com", &[&scored]);
        assert!(message.text.contains("Relevance: 73 %"));
        assert!(message.html.contains("<strong>Relevance:</strong> 73 %"));

        let message = composer.compose("user@example.com", &[&unscored]);
        assert!(!message.text.contains("Relevance"));
        assert!(!message.html.contains("Relevance"));
    }
}
