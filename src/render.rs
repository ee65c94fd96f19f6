// ABOUTME: Plain-text rendering of conversation messages and product cards
// ABOUTME: Shared by the CLI output and the terminal UI carousel

use shopchat_core::{segment, Message, Product, Sender};

pub fn carousel_title(count: usize) -> String {
    format!("Recommended Products ({})", count)
}

/// "950TK (was 1200TK, save 250 TK)" whenever an original price is listed
pub fn price_line(product: &Product) -> String {
    let price = product.display_price();
    let original = product.original_price.as_deref().filter(|p| !p.is_empty());
    match (original, product.savings()) {
        (Some(original), Some(saved)) => {
            format!("{} (was {}, save {} TK)", price, original, saved)
        }
        (Some(original), None) => format!("{} (was {})", price, original),
        _ => price.to_string(),
    }
}

fn plain_carousel(products: &[Product]) -> String {
    let mut out = format!("[{}]\n", carousel_title(products.len()));
    for (i, product) in products.iter().enumerate() {
        out.push_str(&format!("  {}. {} - {}\n", i + 1, product.name, price_line(product)));
        if let Some(highlights) = product.highlights.as_deref().filter(|h| !h.is_empty()) {
            out.push_str(&format!("     {}\n", highlights));
        }
        if let Some(link) = product.buy_link.as_deref().filter(|l| !l.is_empty()) {
            out.push_str(&format!("     {}\n", link));
        }
    }
    out
}

/// Message text with any product carousel spliced in where the reply introduces it
pub fn plain_message(message: &Message) -> String {
    if message.sender == Sender::User {
        return match &message.image {
            Some(url) => format!("{}\n[image: {}]", message.text, url),
            None => message.text.clone(),
        };
    }

    match segment(&message.text, &message.products) {
        Some(point) => {
            let (before, after) = point.split(&message.text);
            let mut out = before.trim_end().to_string();
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&plain_carousel(&message.products));
            out.push_str(after);
            out.trim_end().to_string()
        }
        None => message.text.clone(),
    }
}

/// Display name for a message author
pub fn sender_label<'a>(sender: Sender, bot_name: &'a str) -> &'a str {
    match sender {
        Sender::User => "You",
        Sender::Bot => bot_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toner() -> Product {
        Product {
            id: "1".to_string(),
            name: "Toner".to_string(),
            price: Some("950TK".to_string()),
            original_price: Some("1200TK".to_string()),
            highlights: Some("Alcohol free".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_price_line_with_savings() {
        assert_eq!(price_line(&toner()), "950TK (was 1200TK, save 250 TK)");
        let plain = Product {
            price: None,
            ..Default::default()
        };
        assert_eq!(price_line(&plain), "Price not available");
    }

    #[test]
    fn test_price_line_shows_savings_for_any_original_price() {
        let same = Product {
            price: Some("500TK".to_string()),
            original_price: Some("500TK".to_string()),
            ..Default::default()
        };
        assert_eq!(price_line(&same), "500TK (was 500TK, save 0 TK)");

        let unparsed = Product {
            price: Some("500TK".to_string()),
            original_price: Some("call us".to_string()),
            ..Default::default()
        };
        assert_eq!(price_line(&unparsed), "500TK (was call us)");
    }

    #[test]
    fn test_carousel_is_spliced_after_intro() {
        let message = Message::bot(
            "Here are some recommendations: use it twice daily.",
            vec![toner()],
        );
        let text = plain_message(&message);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Here are some recommendations:");
        assert_eq!(lines[1], "[Recommended Products (1)]");
        assert!(lines[2].contains("Toner - 950TK"));
        assert_eq!(lines.last(), Some(&"use it twice daily."));
    }

    #[test]
    fn test_reply_without_trigger_has_no_carousel() {
        let message = Message::bot("Drink water.", vec![toner()]);
        assert_eq!(plain_message(&message), "Drink water.");
    }

    #[test]
    fn test_user_message_shows_image() {
        let message = Message::user("Is this ok?", Some("https://img.example.com/a.png".into()));
        assert_eq!(
            plain_message(&message),
            "Is this ok?\n[image: https://img.example.com/a.png]"
        );
    }
}
