//! Parser throughput on synthetic catalog, film and review pages

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use catalog_refresh_lib::domain::{CatalogEntry, merge_entries};
use catalog_refresh_lib::infrastructure::{CatalogPageParser, FilmPageParser, ReviewPageParser};

/// A full 72-poster catalog page, the size the site serves
fn catalog_page() -> String {
    let tiles: String = (0..72)
        .map(|i| {
            format!(
                r#"<li class="poster-container"><div class="film-poster" data-film-slug="film-{i}" data-target-link="/film/film-{i}/"></div><p class="poster-viewingdata"><span class="rating rated-7">★★★½</span></p></li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><ul class="poster-list">{tiles}</ul><div class="pagination"><a class="next" href="/alice/films/by/date/page/2/">Older</a></div></body></html>"#
    )
}

const FILM_PAGE: &str = r#"<html><head>
    <meta property="og:title" content="Heat (1995)" />
    <script type="application/ld+json">/* <![CDATA[ */ {"image":"https://a.ltrbxd.com/heat.jpg","datePublished":"1995-12-15"} /* ]]> */</script>
    </head><body><section id="featured-film-header"><small class="number"><a>1995</a></small>
    <span class="directorlist"><a class="contributor">Michael Mann</a></span></section></body></html>"#;

const REVIEW_PAGE: &str = r#"<html><body>
    <p class="date-links"><a href="/alice/films/diary/for/2024/03/09/">9 Mar 2024</a></p>
    <div class="review body-text"><p>First paragraph.</p><p>Second paragraph.</p></div>
    </body></html>"#;

fn parser_benchmarks(c: &mut Criterion) {
    let catalog_parser = CatalogPageParser::new().expect("default selectors compile");
    let film_parser = FilmPageParser::new().expect("default selectors compile");
    let review_parser = ReviewPageParser::new().expect("default selectors compile");
    let catalog = catalog_page();

    let mut group = c.benchmark_group("parsers");
    group.bench_function("catalog_page_72_items", |b| {
        b.iter(|| catalog_parser.parse(black_box(&catalog)))
    });
    group.bench_function("film_page", |b| b.iter(|| film_parser.parse(black_box(FILM_PAGE))));
    group.bench_function("review_page", |b| b.iter(|| review_parser.parse(black_box(REVIEW_PAGE))));
    group.finish();
}

fn merge_benchmark(c: &mut Criterion) {
    let existing: Vec<CatalogEntry> = (0..2_000)
        .map(|i| CatalogEntry::placeholder(format!("https://letterboxd.com/film/film-{i}/")))
        .collect();
    let scraped: Vec<CatalogEntry> = (1_950..2_050)
        .map(|i| CatalogEntry::placeholder(format!("https://letterboxd.com/film/film-{i}/")))
        .collect();

    c.bench_function("merge_2000_plus_100", |b| {
        b.iter(|| merge_entries(black_box(existing.clone()), black_box(scraped.clone())))
    });
}

criterion_group!(benches, parser_benchmarks, merge_benchmark);
criterion_main!(benches);
