//! Prompt templates for every oracle call the pipeline makes.
//!
//! Each template demands pure output (JSON or plain text, never narrative
//! around it) and pins the exact shape with few-shot examples. The demands
//! are instructions to an untrusted model, not guarantees: the pipeline
//! re-parses and re-validates everything these prompts produce.

use crate::types::{RecordedEntry, ReportRow};

/// Read-side schema embedded in the report-query prompt.
///
/// Mirrors `migrations/001_schema.sql` minus the users table, which the
/// oracle never needs to see.
const REPORT_SCHEMA: &str = r#"CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    total_amount NUMERIC(12, 2) NOT NULL,
    kind VARCHAR(10) NOT NULL, -- 'income' or 'expense'
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE transaction_items (
    id BIGSERIAL PRIMARY KEY,
    transaction_id BIGINT NOT NULL REFERENCES transactions(id),
    item_name TEXT NOT NULL,
    quantity NUMERIC(12, 3) NOT NULL,
    unit_price NUMERIC(12, 2) NOT NULL
);"#;

/// Compose the intent-classification prompt for one inbound message.
///
/// The oracle must answer with a single JSON object: an `intent` tag
/// (CREATE, READ, BOTH, or OTHER) plus a `transaction` payload when the
/// intent involves recording.
pub fn intent_classification(user_message: &str) -> String {
    format!(
        r#"You are an expert intent classifier and data extraction API. Your job is to analyze a user's message and determine their intent, which can be 'CREATE', 'READ', 'BOTH', or 'OTHER'. You must also extract transaction data if the intent involves creating a record.

Your output MUST be a valid JSON object and nothing else. Do not add any explanatory text or any symbols or words like json or any markdown or such, the output should be pure JSON.

The user's message is: "{user_message}"

- If the user wants to log, add, or record new information (like an expense or income), the intent is 'CREATE'.
- If the user is asking a question or requesting a summary/report about their finances, the intent is 'READ'.
- If the user is doing both of the above in the same message, the intent is 'BOTH'.
- If the message is a greeting, a general non-financial question, or anything that doesn't fit the above categories, the intent is 'OTHER'.

If the intent is 'CREATE' or 'BOTH', you MUST also extract the transaction details into a 'transaction' object. If the intent is 'READ' or 'OTHER', there will be no 'transaction' object. If a total price is given for multiple units of one item, divide to get price_per_item.

---
Example 1 Input Message: "i bought 2 milkshakes for 20rs and 1 coffee for 15"
Example 1 Output Format:
{{
  "intent": "CREATE",
  "transaction": {{
    "type": "expense",
    "items": [
      {{ "item_name": "milkshake", "quantity": 2, "price_per_item": 10 }},
      {{ "item_name": "coffee", "quantity": 1, "price_per_item": 15 }}
    ]
  }}
}}
---
Example 2 Input Message: "how much did i spend this week?"
Example 2 Output Format:
{{
  "intent": "READ"
}}
---
Example 3 Input Message: "received 5000rs salary"
Example 3 Output Format:
{{
  "intent": "CREATE",
  "transaction": {{
    "type": "income",
    "items": [
      {{ "item_name": "salary", "quantity": 1, "price_per_item": 5000 }}
    ]
  }}
}}
---
Example 4 Input Message: "Log that I bought a pizza for 250. Also, what were my total expenses last month?"
Example 4 Output Format:
{{
  "intent": "BOTH",
  "transaction": {{
    "type": "expense",
    "items": [
      {{ "item_name": "pizza", "quantity": 1, "price_per_item": 250 }}
    ]
  }}
}}
---
Example 5 Input Message: "hey how are you doing"
Example 5 Output Format:
{{
  "intent": "OTHER"
}}
---
Example 6 Input Message: "what is your name?"
Example 6 Output Format:
{{
  "intent": "OTHER"
}}"#
    )
}

/// Compose the report-query synthesis prompt.
///
/// Mandates a parameterized single SELECT scoped to the requesting user.
/// The anti-double-count rule matters: `total_amount` lives on the entry,
/// so a totals query that joins `transaction_items` would repeat it once
/// per item. The subquery pattern in Example 3 is the sanctioned way to
/// filter by item while summing entries.
pub fn report_query(question: &str, user_id: i64) -> String {
    format!(
        r#"You are a PostgreSQL expert who writes read-only, parameterized SQL queries. Given the database schema and a user's question, you must generate a JSON object containing a SQL SELECT query and its corresponding parameters array.

Your output MUST be a valid JSON object and nothing else. Do not add any explanatory text or markdown.

The JSON object must have two keys:
1. "query": A string containing a single SQL SELECT statement with placeholders (e.g., $1, $2). Never use CTEs (WITH); use subqueries instead. Never generate INSERT, UPDATE, DELETE, or DDL.
2. "params": An array containing the values for these placeholders in the correct order.

Crucially, the query MUST include a "WHERE user_id = $1" clause, and the first element in the 'params' array MUST be the user's ID.

When the question asks for a total or sum, sum transactions.total_amount and do NOT join transaction_items into the aggregation: each item row repeats its entry's total_amount, so a joined SUM double-counts. Filter by item using a subquery on transaction_items as in Example 3.

Database Schema:
{REPORT_SCHEMA}

---
Example 1 User Question: "how much did i spend this month"
Example 1 Output:
{{
  "query": "SELECT SUM(total_amount) AS total FROM transactions WHERE user_id = $1 AND kind = $2 AND created_at >= date_trunc('month', current_date);",
  "params": ["{user_id}", "expense"]
}}
---
Example 2 User Question: "what were my last 5 income transactions"
Example 2 Output:
{{
  "query": "SELECT total_amount, description, created_at FROM transactions WHERE user_id = $1 AND kind = $2 ORDER BY created_at DESC LIMIT 5;",
  "params": ["{user_id}", "income"]
}}
---
Example 3 User Question: "how much have i spent on coffee"
Example 3 Output:
{{
  "query": "SELECT SUM(total_amount) AS total FROM transactions WHERE user_id = $1 AND kind = $2 AND id IN (SELECT transaction_id FROM transaction_items WHERE item_name ILIKE $3);",
  "params": ["{user_id}", "expense", "%coffee%"]
}}
---
User Question: "{question}""#
    )
}

/// Compose the narration prompt turning query rows into a reply.
///
/// When the same message also recorded a transaction, `ack` carries the
/// write outcome so the reply can confirm it alongside the answer.
pub fn narrate_report(rows: &[ReportRow], question: &str, ack: Option<&RecordedEntry>) -> String {
    let data = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_owned());

    let ack_section = match ack {
        Some(entry) => format!(
            "\nBefore answering, confirm to the user that their {} of ₹{} was just recorded successfully.\n",
            entry.kind.as_str(),
            entry.total_amount
        ),
        None => String::new(),
    };

    format!(
        r#"You are a helpful financial assistant. You will be given a user's original question and the data retrieved from a database to answer that question. Your task is to formulate a clear, friendly, and natural language response for the user.

Your output MUST be only the text response to be sent to the user, and nothing else. Do not add any explanatory text or markdown. Be concise and directly answer the question.

If the data contains a pre-computed total or sum field, treat that value as authoritative and use it directly. NEVER add up individual row amounts yourself.
{ack_section}
---
User's Original Question: "{question}"
---
Data from Database (in JSON format):
{data}
---

Here are some examples of how to respond:

---
Example 1 User Question: "how much did i spend this month"
Example 1 Data: [{{ "total": "1550.75" }}]
Example 1 Your Response: You've spent a total of ₹1550.75 this month.
---
Example 2 User Question: "what were my last 2 expenses"
Example 2 Data: [{{ "total_amount": "250.00", "created_at": "2024-09-01T10:00:00Z" }}, {{ "total_amount": "75.00", "created_at": "2024-08-30T15:30:00Z" }}]
Example 2 Your Response: Here are your last 2 expenses:
- ₹250.00 on September 1
- ₹75.00 on August 30
---
Example 3 User Question: "did i buy any coffee this week"
Example 3 Data: []
Example 3 Your Response: I couldn't find any records of you buying coffee this week.
---

Now, based on the user's question and the data provided above, generate the response. Your Response:"#
    )
}

/// Compose the introductory prompt for greetings and off-topic messages.
pub fn introduction(user_message: &str) -> String {
    format!(
        r#"You are a friendly financial assistant chatbot for WhatsApp. A user has sent a message that isn't a command to log a transaction or ask a financial question. Your task is to introduce yourself and briefly explain what you can do, while acknowledging their original message.

The user's original message was: "{user_message}"

Your output MUST be only the text response to be sent to the user, and nothing else. Do not add any explanatory text or markdown.

Keep the tone friendly, helpful, and concise.

Here are the key points to include:
- Greet the user.
- State that you are a financial assistant.
- Mention that you can help track expenses and income.
- Give a simple example of how to log an expense (e.g., "I bought coffee for 20").
- Give a simple example of how to ask a question (e.g., "How much did I spend this week?")."#
    )
}
