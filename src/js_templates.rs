//! Function declarations invoked with `this` bound to a resolved element.
//!
//! Results that are objects are returned as JSON strings because
//! `Runtime.callFunctionOn` only returns primitives by value.

pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub const FORCE_CLICK: &str = r#"function(){this.scrollIntoView({block:'center',behavior:'instant'});this.click();return true}"#;

pub const CLEAR_VALUE: &str = r#"function(){if('value' in this){this.value='';this.dispatchEvent(new Event('input',{bubbles:true}))}return true}"#;

pub const DESCRIBE_NODE: &str = r#"function(){return JSON.stringify({className:(typeof this.className==='string'?this.className:(this.getAttribute('class')||'')),childElementCount:this.childElementCount})}"#;

/// Walks up from the element and returns the text of the first node matching
/// `css` inside a following sibling of the element or of one of its ancestors.
pub fn nearby_text(css: &str, max_depth: u32) -> String {
    let escaped = escape_literal(css);
    format!(
        r#"function(){{let node=this;for(let depth=0;node&&depth<={max_depth};depth++){{let sib=node.nextElementSibling;while(sib){{const hit=sib.matches('{css}')?sib:sib.querySelector('{css}');if(hit){{const t=(hit.innerText||hit.textContent||'').trim();if(t)return t}}sib=sib.nextElementSibling}}node=node.parentElement}}return null}}"#,
        max_depth = max_depth,
        css = escaped,
    )
}
