// Coupon email copy: deterministic templates, personalization prompts and layout

use crate::notifications::models::{EmailMessage, NotificationPayload};
use crate::policies::SentimentType;
use crate::reviews::LikedCategory;

const REDEEM_HINT: &str = "(Please show this email in-store to redeem.)";

/// "a", "a and b", "a, b and c"
pub fn join_with_and(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Template intro for a happy customer
pub fn generic_positive(restaurant_name: &str, liked: &[LikedCategory]) -> String {
    if liked.is_empty() {
        return format!(
            "Thanks for visiting {restaurant_name} and for your wonderful review! \
             We're glad you enjoyed your experience."
        );
    }

    let liked_names: Vec<&str> = liked.iter().map(|c| c.as_str()).collect();
    let mut message = format!("We're thrilled that you enjoyed our {}!", join_with_and(&liked_names));

    let not_liked: Vec<&str> = LikedCategory::ALL
        .iter()
        .filter(|c| !liked.contains(*c))
        .map(|c| c.as_str())
        .collect();
    if (1..=2).contains(&not_liked.len()) {
        message.push_str(&format!(
            " We'll keep working to make the {} even better for your next visit.",
            not_liked.join(" and ")
        ));
    }
    message
}

/// Template intro for an unhappy customer, routed on feedback keywords
pub fn generic_negative(restaurant_name: &str, feedback: Option<&str>) -> String {
    let feedback = feedback.unwrap_or_default().to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| feedback.contains(w));

    if mentions(&["cold"]) {
        format!(
            "We're sorry that your food was cold when you received it at {restaurant_name}. \
             That's not the experience we want for you, and we're taking steps to fix it."
        )
    } else if mentions(&["wait", "slow"]) {
        format!(
            "We apologize for the long wait at {restaurant_name}. We understand how \
             frustrating that can be and are working to improve our service speed."
        )
    } else if mentions(&["rude", "unfriendly", "staff"]) {
        format!(
            "We're sorry about the service experience at {restaurant_name}. Your feedback \
             has been shared with our team and we're committed to doing better."
        )
    } else {
        format!(
            "We're truly sorry to hear about your experience at {restaurant_name}. Your \
             feedback means a lot to us, and we're committed to making things right."
        )
    }
}

/// Template intro for any payload
pub fn generic_intro(payload: &NotificationPayload) -> String {
    match payload.sentiment {
        SentimentType::Positive => {
            generic_positive(&payload.restaurant_name, &payload.liked_categories)
        }
        SentimentType::Negative => {
            generic_negative(&payload.restaurant_name, payload.customer_feedback.as_deref())
        }
    }
}

/// Prompt asking the text generator for a 2-3 sentence intro
pub fn personalization_prompt(payload: &NotificationPayload) -> String {
    let mut lines = vec![
        "You write short, warm, human-sounding email messages for restaurants.".to_string(),
    ];

    match payload.sentiment {
        SentimentType::Positive => {
            let liked: Vec<&str> = payload.liked_categories.iter().map(|c| c.as_str()).collect();
            let liked = if liked.is_empty() {
                "(none selected)".to_string()
            } else {
                liked.join(", ")
            };
            lines.push(
                "Write a grateful response to a customer who left a positive review.".to_string(),
            );
            lines.push(
                "Reference the specific things they liked. If they didn't select everything, \
                 briefly mention the restaurant's commitment to improving the rest."
                    .to_string(),
            );
            push_style_rules(&mut lines);
            lines.push(format!("Restaurant: {}", payload.restaurant_name));
            lines.push(format!("Categories the customer liked: {liked}"));
            if let Some(reward) = &payload.offer_reward {
                lines.push(format!("Thank-you coupon being offered: {reward}"));
            }
        }
        SentimentType::Negative => {
            let feedback = payload
                .customer_feedback
                .as_deref()
                .filter(|f| !f.is_empty())
                .unwrap_or("(No specific feedback provided)");
            lines.push(
                "Write a sympathetic response to a customer who had a negative experience."
                    .to_string(),
            );
            push_style_rules(&mut lines);
            lines.push(format!("Restaurant: {}", payload.restaurant_name));
            lines.push(format!("Customer's feedback: {feedback}"));
            if let Some(reward) = &payload.offer_reward {
                lines.push(format!("Coupon being offered: {reward}"));
            }
        }
    }

    lines.join("\n")
}

fn push_style_rules(lines: &mut Vec<String>) {
    lines.push("Keep it brief (2-3 sentences), genuine, and avoid corporate-speak.".to_string());
    lines.push(
        "Do NOT include subject line, greeting, or signature - just the body message.".to_string(),
    );
}

/// "{title} — {reward}", or whichever of the two exists
pub fn offer_line(title: Option<&str>, reward: Option<&str>) -> Option<String> {
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let reward = reward.map(str::trim).filter(|r| !r.is_empty());
    match (title, reward) {
        (Some(title), Some(reward)) => Some(format!("{title} — {reward}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

/// Lay out the full email around an intro paragraph
///
/// Empty lines are dropped, so optional parts leave no gaps.
pub fn compose_message(payload: &NotificationPayload, intro: &str) -> EmailMessage {
    let name = &payload.restaurant_name;
    let offer = offer_line(payload.offer_title.as_deref(), payload.offer_reward.as_deref());

    let (subject, lines) = match payload.sentiment {
        SentimentType::Positive => (
            format!("{name} — thanks for your review!"),
            vec![
                Some(intro.to_string()),
                offer.map(|o| format!("Offer: {o}")),
                Some(format!("Coupon code: {}", payload.coupon_code)),
                payload
                    .review_url
                    .as_ref()
                    .map(|url| format!("Leave a Google review: {url}")),
                Some(REDEEM_HINT.to_string()),
                Some(format!("— The {name} team")),
            ],
        ),
        SentimentType::Negative => (
            format!("{name} — we'd love to make it up to you"),
            vec![
                Some(intro.to_string()),
                offer.map(|o| format!("Here's a little something: {o}")),
                Some(format!("Your coupon code: {}", payload.coupon_code)),
                Some(REDEEM_HINT.to_string()),
                Some(format!("— The {name} team")),
            ],
        ),
    };

    let text = lines
        .into_iter()
        .flatten()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    EmailMessage {
        to: payload.recipient.clone(),
        subject,
        text,
    }
}
