// ABOUTME: Product carousel card drawn inline in a bot reply
// ABOUTME: Shows one product at a time with its position, price, savings, highlights and buy link

use ratatui::prelude::*;
use shopchat_core::Product;

use crate::render::carousel_title;
use crate::tui::theme;

const MIN_CARD_WIDTH: usize = 24;

fn border(text: &str) -> Span<'static> {
    Span::styled(text.to_string(), Style::default().fg(theme::BORDER_COLOR))
}

/// Card lines for `products[position]`, sized to `width` columns
pub fn carousel_lines(products: &[Product], position: usize, width: u16) -> Vec<Line<'static>> {
    if products.is_empty() {
        return Vec::new();
    }
    let position = position % products.len();
    let product = &products[position];
    let width = usize::from(width).max(MIN_CARD_WIDTH);

    let title = format!(" {} ", carousel_title(products.len()));
    let pager = format!(" ◀ {}/{} ▶ ", position + 1, products.len());
    let fill = width.saturating_sub(title.chars().count() + pager.chars().count() + 3);

    let mut lines = vec![Line::from(vec![
        border("╭─"),
        Span::styled(
            title,
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        border(&"─".repeat(fill)),
        Span::styled(pager, Style::default().fg(theme::DIM_TEXT)),
        border("╮"),
    ])];

    lines.push(Line::from(vec![
        border("│ "),
        Span::styled(
            product.name.clone(),
            Style::default()
                .fg(theme::TEXT_COLOR)
                .add_modifier(Modifier::BOLD),
        ),
    ]));

    let mut price = vec![
        border("│ "),
        Span::styled(
            product.display_price().to_string(),
            Style::default().fg(theme::PRICE_COLOR),
        ),
    ];
    if let Some(original) = product.original_price.as_deref().filter(|p| !p.is_empty()) {
        price.push(Span::styled(
            format!("  {}", original),
            Style::default()
                .fg(theme::DIM_TEXT)
                .add_modifier(Modifier::CROSSED_OUT),
        ));
    }
    if let Some(saved) = product.savings() {
        price.push(Span::styled(
            format!("  Save {} TK", saved),
            Style::default()
                .fg(theme::SAVINGS_COLOR)
                .add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(price));

    if let Some(highlights) = product.highlights.as_deref().filter(|h| !h.is_empty()) {
        lines.push(Line::from(vec![
            border("│ "),
            Span::styled(
                highlights.to_string(),
                Style::default()
                    .fg(theme::DIM_TEXT)
                    .add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    if let Some(link) = product.buy_link.as_deref().filter(|l| !l.is_empty()) {
        lines.push(Line::from(vec![
            border("│ "),
            Span::styled("Buy now: ", Style::default().fg(theme::TEXT_COLOR)),
            Span::styled(
                link.to_string(),
                Style::default()
                    .fg(theme::LINK_COLOR)
                    .add_modifier(Modifier::UNDERLINED),
            ),
        ]));
    }

    lines.push(Line::from(border(&format!(
        "╰{}╯",
        "─".repeat(width.saturating_sub(2))
    ))));
    lines
}
