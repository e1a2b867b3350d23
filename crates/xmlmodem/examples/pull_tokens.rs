//! Pulls a document apart token by token and prints what it finds.
//!
//! Run with: `cargo run --example pull_tokens`

use xmlmodem::{Namespace, Token, XmlReader};

const DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns:media="http://search.example/ns">
  <!-- two entries, one with rich text -->
  <entry id="1" media:rating="g">
    <title>First &amp; foremost</title>
    <summary><![CDATA[Plain <text>, no entities here]]></summary>
  </entry>
  <entry id="2"/>
</feed>
"#;

fn main() -> xmlmodem::Result<()> {
    let mut reader = XmlReader::new(DOC.as_bytes());
    let mut ns = Namespace::default();
    let mut depth = 0usize;

    loop {
        let indent = "  ".repeat(depth);
        match reader.peek()? {
            Token::BeginTag => {
                let name = reader.begin_tag(&mut ns)?;
                match &ns.uri {
                    Some(uri) => println!("{indent}<{name}> (in {uri})"),
                    None => println!("{indent}<{name}>"),
                }
                depth += 1;
            }
            Token::AttributeName => {
                let name = reader.next_attribute(&mut ns)?;
                let value = reader.next_attribute_value()?;
                println!("{indent}@{name} = {value:?}");
            }
            Token::Text => {
                let text = reader.next_text()?;
                println!("{indent}text {text:?}");
            }
            Token::EndTag => {
                reader.end_tag()?;
                depth -= 1;
                println!("{}end (back at {})", "  ".repeat(depth), reader.current_path());
            }
            Token::AttributeValue => reader.skip()?,
            Token::EndDocument => break,
        }
    }
    Ok(())
}
