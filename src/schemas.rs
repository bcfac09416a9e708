//! Ready-made JSON schemas for structured extraction.

use serde_json::{Value, json};

/// A list of news articles with title, url, author, date and summary.
pub fn news_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "articles": {
                "type": "array",
                "description": "List of news articles",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "The title of the news article"},
                        "url": {"type": "string", "description": "The URL of the news article"},
                        "author": {"type": "string", "description": "The author of the news article"},
                        "date": {"type": "string", "description": "Publication date"},
                        "summary": {"type": "string", "description": "Brief summary of the article"}
                    },
                    "required": ["title", "url", "author", "date", "summary"]
                }
            }
        },
        "required": ["articles"]
    })
}

pub fn product_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Product name"},
            "price": {"type": "number", "description": "Product price"},
            "currency": {"type": "string", "description": "Currency code"},
            "description": {"type": "string", "description": "Product description"},
            "image_url": {"type": "string", "description": "Main product image URL"},
            "availability": {"type": "string", "description": "Product availability status"}
        },
        "required": ["name", "price", "currency", "description", "image_url", "availability"]
    })
}

pub fn company_details_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "company_mission": {"type": "string"},
            "supports_sso": {"type": "boolean"},
            "is_open_source": {"type": "boolean"},
            "is_in_yc": {"type": "boolean"}
        },
        "required": ["company_mission", "supports_sso", "is_open_source", "is_in_yc"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(schema: &Value) -> Vec<&str> {
        schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect()
    }

    #[test]
    fn every_required_field_has_a_property() {
        for schema in [news_schema(), product_schema(), company_details_schema()] {
            let properties = schema["properties"].as_object().unwrap();
            for field in required(&schema) {
                assert!(properties.contains_key(field), "{field} missing");
            }
        }
    }

    #[test]
    fn news_items_are_articles() {
        let schema = news_schema();
        let items = &schema["properties"]["articles"]["items"];
        assert_eq!(required(items), ["title", "url", "author", "date", "summary"]);
    }

    #[test]
    fn product_price_is_numeric() {
        assert_eq!(product_schema()["properties"]["price"]["type"], "number");
    }
}
