//! Category page rendering

use crate::{page_response, ApiError, AppState, RECORDS_CHANGED};
use fintrack_utils::escape_html;
use std::collections::HashMap;

pub async fn page_categories(
    _state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Categories</h2></div>
        <div id='category-alert'></div>
        <form hx-post='/categories' hx-target='#category-alert' class='flex gap-2 mb-6 max-w-xl'>
            <input name='name' placeholder='New category' class='flex-1 px-3 py-2 border rounded-lg'>
            <button class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Add</button>
        </form>
        <div id='category-list' hx-get='/categories/list' hx-trigger='load, {} from:body' class='bg-white rounded-xl shadow-sm p-6'>
            <p class='text-gray-500 text-center'>Loading...</p>
        </div>"#,
        RECORDS_CHANGED
    );

    axum::response::Html(page_response(&headers, "Categories", "/categories", &inner_content))
}

pub async fn htmx_categories_list(state: axum::extract::State<AppState>) -> axum::response::Html<String> {
    let ledger = state.ledger.read().await;
    let loaded = ledger
        .categories()
        .and_then(|categories| Ok((categories, ledger.expenses(None)?)));

    let html = match loaded {
        Ok((categories, expenses)) => {
            let mut usage: HashMap<&str, usize> = HashMap::new();
            for e in &expenses {
                *usage.entry(e.category.as_str()).or_default() += 1;
            }
            let rows: String = categories
                .iter()
                .map(|name| {
                    let escaped = escape_html(name);
                    let count = usage.get(name.as_str()).copied().unwrap_or(0);
                    format!(
                        r#"<tr class='border-b'>
                <td class='py-2 font-medium'>{name}</td>
                <td class='py-2 text-gray-500'>{count} expense(s)</td>
                <td class='py-2'>
                    <form hx-post='/categories/rename' hx-target='#category-alert' class='flex gap-2'>
                        <input type='hidden' name='old' value='{name}'>
                        <input name='new' placeholder='Rename to' class='px-2 py-1 text-sm border rounded'>
                        <button class='px-2 py-1 text-sm border rounded hover:bg-gray-50'>Rename</button>
                    </form>
                </td>
                <td class='py-2 text-right'>
                    <form hx-post='/categories/delete' hx-target='#category-alert' hx-confirm='Delete this category?'>
                        <input type='hidden' name='name' value='{name}'>
                        <button class='px-2 py-1 text-sm text-red-600 border border-red-200 rounded hover:bg-red-50'>Delete</button>
                    </form>
                </td>
            </tr>"#,
                        name = escaped,
                        count = count
                    )
                })
                .collect();
            format!("<table class='w-full text-sm'><tbody>{}</tbody></table>", rows)
        }
        Err(e) => {
            let e = ApiError::from(e);
            e.log("htmx_categories_list");
            crate::alert_error(&e.user_message())
        }
    };
    axum::response::Html(html)
}
