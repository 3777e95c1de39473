//! PDF output for receipts
//!
//! One A4 page: ORIGINAL on the top half, COPY on the bottom half. Text uses
//! the built-in Courier faces, which have a fixed advance width, so centering
//! needs no font metrics.

use lopdf::{Document, Object, Stream, dictionary};

use crate::receipt::{Receipt, wrap};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MM: f32 = 2.834_646;
const MARGIN: f32 = 15.0 * MM;

/// Courier advance width as a fraction of the font size
const COURIER_ADVANCE: f32 = 0.6;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

const BLUE: (f32, f32, f32) = (0.1, 0.3, 0.6);
const GRAY: (f32, f32, f32) = (0.4, 0.4, 0.4);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

/// Build the receipt PDF
pub fn render_receipt(receipt: &Receipt) -> crate::Result<Vec<u8>> {
    let mut page = PageContent::default();
    let middle = PAGE_HEIGHT / 2.0;

    draw_section(&mut page, receipt, "ORIGINAL", PAGE_HEIGHT - 10.0 * MM, middle + 5.0 * MM);
    page.line(MARGIN, middle, PAGE_WIDTH - MARGIN, middle, 2.0, BLACK);
    draw_section(&mut page, receipt, "COPY", middle - 5.0 * MM, 10.0 * MM);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font("Courier"));
    let bold_id = doc.add_object(font("Courier-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, page.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn draw_section(page: &mut PageContent, receipt: &Receipt, label: &str, top: f32, bottom: f32) {
    let left = MARGIN;
    let right = PAGE_WIDTH - MARGIN;
    let text_left = left + 3.0 * MM;
    let mut y = top;

    page.rect(left, bottom, right - left, top - bottom, 1.2, GRAY);
    page.text_right(right - 3.0 * MM, y - 4.0 * MM, BOLD, 12.0, BLUE, label);
    y -= 12.0 * MM;

    page.text_centered(y, BOLD, 16.0, BLUE, &receipt.business_name);
    y -= 6.0 * MM;
    if let Some(address) = &receipt.business_address {
        page.text_centered(y, REGULAR, 10.0, GRAY, address);
        y -= 4.5 * MM;
    }
    if let Some(contact) = &receipt.contact_line {
        page.text_centered(y, REGULAR, 10.0, GRAY, contact);
        y -= 4.5 * MM;
    }
    y -= 1.0 * MM;
    page.line(left + 15.0 * MM, y, right - 15.0 * MM, y, 1.0, BLUE);
    y -= 7.0 * MM;

    page.text_centered(y, BOLD, 14.0, BLUE, "REPAIR RECEIPT");
    y -= 8.0 * MM;
    page.text(text_left, y, BOLD, 11.0, BLACK, &format!("No. {}", receipt.ticket_number));
    page.text_right(
        right - 3.0 * MM,
        y,
        BOLD,
        11.0,
        BLACK,
        &format!("Date: {}", receipt.intake_date),
    );
    y -= 8.0 * MM;

    page.text(text_left, y, BOLD, 12.0, BLUE, "CUSTOMER");
    y -= 6.0 * MM;
    page.text(text_left, y, REGULAR, 11.0, BLACK, &format!("Name:   {}", receipt.customer_name));
    y -= 5.0 * MM;
    page.text(text_left, y, REGULAR, 11.0, BLACK, &format!("Phone:  {}", receipt.customer_phone));
    y -= 5.0 * MM;
    page.text(text_left, y, REGULAR, 11.0, BLACK, &format!("Device: {}", receipt.product));
    y -= 5.0 * MM;

    let columns = ((right - text_left - 3.0 * MM) / (11.0 * COURIER_ADVANCE)) as usize;
    let work = receipt
        .work
        .as_deref()
        .map(|w| wrap(w, columns.saturating_sub(8).max(10)))
        .unwrap_or_default();
    for (i, line) in work.iter().enumerate() {
        let label = if i == 0 { "Work:  " } else { "       " };
        page.text(text_left, y, REGULAR, 11.0, BLACK, &format!("{} {}", label, line));
        y -= 5.0 * MM;
    }
    y -= 2.0 * MM;

    if let Some(cost) = &receipt.estimated_cost {
        let height = 9.0 * MM;
        page.rect(left + 1.0 * MM, y - height, right - left - 2.0 * MM, height, 1.5, BLUE);
        page.text_centered(y - 6.0 * MM, BOLD, 14.0, BLUE, &format!("ESTIMATED COST: {}", cost));
    }

    let signature_y = bottom + 18.0 * MM;
    page.line(right - 80.0 * MM, signature_y, right - 3.0 * MM, signature_y, 1.0, GRAY);
    page.text(right - 60.0 * MM, signature_y - 4.0 * MM, REGULAR, 9.0, GRAY, "Customer signature");

    let mut terms_y = signature_y - 10.0 * MM;
    for term in &receipt.terms {
        page.text_centered(terms_y, REGULAR, 7.0, GRAY, term);
        terms_y -= 4.0 * MM;
    }
}

/// Raw content stream operators for one page
#[derive(Default)]
struct PageContent {
    ops: Vec<u8>,
}

impl PageContent {
    fn text(&mut self, x: f32, y: f32, font: &str, size: f32, color: (f32, f32, f32), s: &str) {
        let (r, g, b) = color;
        self.push(&format!(
            "BT {r:.2} {g:.2} {b:.2} rg /{font} {size} Tf {x:.2} {y:.2} Td ("
        ));
        self.ops.extend(encode_win_ansi(s));
        self.push(") Tj ET\n");
    }

    fn text_centered(&mut self, y: f32, font: &str, size: f32, color: (f32, f32, f32), s: &str) {
        let x = ((PAGE_WIDTH - text_width(s, size)) / 2.0).max(MARGIN);
        self.text(x, y, font, size, color, s);
    }

    fn text_right(
        &mut self,
        right: f32,
        y: f32,
        font: &str,
        size: f32,
        color: (f32, f32, f32),
        s: &str,
    ) {
        self.text(right - text_width(s, size), y, font, size, color, s);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: (f32, f32, f32)) {
        let (r, g, b) = color;
        self.push(&format!(
            "{r:.2} {g:.2} {b:.2} RG {width:.2} w {x1:.2} {y1:.2} m {x2:.2} {y2:.2} l S\n"
        ));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: (f32, f32, f32)) {
        let (r, g, b) = color;
        self.push(&format!(
            "{r:.2} {g:.2} {b:.2} RG {width:.2} w {x:.2} {y:.2} {w:.2} {h:.2} re S\n"
        ));
    }

    fn push(&mut self, s: &str) {
        self.ops.extend_from_slice(s.as_bytes());
    }

    fn into_bytes(self) -> Vec<u8> {
        self.ops
    }
}

fn text_width(s: &str, size: f32) -> f32 {
    s.chars().count() as f32 * size * COURIER_ADVANCE
}

/// Encode a string for a WinAnsi literal, escaping delimiters.
/// Characters outside the encoding become `?`.
fn encode_win_ansi(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '€' => out.push(0x80),
            c if (' '..='~').contains(&c) => out.push(c as u8),
            c if ('\u{a0}'..='\u{ff}').contains(&c) => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}
