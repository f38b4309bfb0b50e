use std::{collections::VecDeque, io};

use grab_matcher::PatternMatcher;

use crate::{
    line_buffer::LineReader,
    sink::{
        Sink, SinkContext, SinkContextKind, SinkError, SinkFinish, SinkMatch,
    },
};

/// Внутренняя конфигурация поисковика. Записывается только билдером.
#[derive(Clone, Debug)]
struct Config {
    /// Разделитель строк.
    line_term: u8,
    /// Инвертировать ли сопоставление.
    invert_match: bool,
    /// Количество контекстных строк перед совпадением.
    before_context: usize,
    /// Количество контекстных строк после совпадения.
    after_context: usize,
    /// Верхняя граница количества выбранных строк на источник.
    max_count: Option<u64>,
    /// Удалять ли CR в конце строки перед сопоставлением и выводом.
    strip_cr: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            line_term: b'\n',
            invert_match: false,
            before_context: 0,
            after_context: 0,
            max_count: None,
            strip_cr: false,
        }
    }
}

/// Конструктор для настройки поисковика.
#[derive(Clone, Debug, Default)]
pub struct SearcherBuilder {
    config: Config,
}

impl SearcherBuilder {
    /// Создать новый конструктор с конфигурацией по умолчанию.
    pub fn new() -> SearcherBuilder {
        SearcherBuilder::default()
    }

    /// Построить поисковик.
    pub fn build(&self) -> Searcher {
        Searcher { config: self.config.clone() }
    }

    /// Установить байт-разделитель строк. По умолчанию `b'\n'`.
    pub fn line_terminator(&mut self, line_term: u8) -> &mut SearcherBuilder {
        self.config.line_term = line_term;
        self
    }

    /// Инвертировать ли сопоставление: выбранными становятся строки, не
    /// совпавшие с шаблоном. По умолчанию отключено.
    pub fn invert_match(&mut self, yes: bool) -> &mut SearcherBuilder {
        self.config.invert_match = yes;
        self
    }

    /// Количество контекстных строк перед каждым совпадением.
    pub fn before_context(&mut self, count: usize) -> &mut SearcherBuilder {
        self.config.before_context = count;
        self
    }

    /// Количество контекстных строк после каждого совпадения.
    pub fn after_context(&mut self, count: usize) -> &mut SearcherBuilder {
        self.config.after_context = count;
        self
    }

    /// Верхняя граница количества выбранных строк. Контекстные строки не
    /// учитываются. `Some(0)` допустимо и немедленно завершает поиск.
    pub fn max_count(&mut self, count: Option<u64>) -> &mut SearcherBuilder {
        self.config.max_count = count;
        self
    }

    /// Удалять ли завершающий CR перед сопоставлением. Действует только
    /// когда разделитель строк — LF. Смещения байтов при этом продолжают
    /// относиться к немодифицированному источнику.
    pub fn strip_cr(&mut self, yes: bool) -> &mut SearcherBuilder {
        self.config.strip_cr = yes;
        self
    }
}

/// Поисковик по одному источнику: разбивает поток на строки, применяет
/// матчер и доставляет совпадения с контекстом в `Sink`.
#[derive(Clone, Debug)]
pub struct Searcher {
    config: Config,
}

/// Строка, отложенная в кольцевой буфер контекста «до».
#[derive(Debug)]
struct PendingLine {
    number: u64,
    offset: u64,
    bytes: Vec<u8>,
}

impl Searcher {
    /// Создать поисковик с настройками по умолчанию.
    pub fn new() -> Searcher {
        SearcherBuilder::new().build()
    }

    /// Выполнить поиск по произвольному читателю.
    pub fn search_reader<R: io::Read, S: Sink>(
        &self,
        matcher: &PatternMatcher,
        rdr: R,
        sink: S,
    ) -> Result<(), S::Error> {
        let reader = LineReader::new(rdr, self.config.line_term);
        self.search(matcher, reader, sink)
    }

    /// Выполнить поиск по срезу байтов.
    pub fn search_slice<S: Sink>(
        &self,
        matcher: &PatternMatcher,
        slice: &[u8],
        sink: S,
    ) -> Result<(), S::Error> {
        self.search_reader(matcher, slice, sink)
    }

    fn search<R: io::Read, S: Sink>(
        &self,
        matcher: &PatternMatcher,
        mut reader: LineReader<R>,
        mut sink: S,
    ) -> Result<(), S::Error> {
        let config = &self.config;
        let any_context =
            config.before_context > 0 || config.after_context > 0;

        let mut before: VecDeque<PendingLine> = VecDeque::new();
        let mut after_left = 0usize;
        let mut selected = 0u64;
        let mut last_emitted: Option<u64> = None;

        loop {
            let limit_reached =
                config.max_count.map_or(false, |limit| selected >= limit);
            if limit_reached && after_left == 0 {
                log::trace!("searcher: достигнут max_count, источник закрыт");
                break;
            }
            let line = match reader.next_line().map_err(S::Error::error_io)? {
                None => break,
                Some(line) => line,
            };
            let bytes = if config.strip_cr
                && config.line_term == b'\n'
                && line.bytes.last() == Some(&b'\r')
            {
                &line.bytes[..line.bytes.len() - 1]
            } else {
                line.bytes
            };
            let is_match = matcher.is_match(bytes) != config.invert_match;

            if limit_reached {
                // Лимит исчерпан: доливаем только открытое окно «после».
                let spans = matcher.find_iter(bytes);
                let keepgoing = if is_match {
                    sink.matched(&SinkMatch {
                        line_number: line.number,
                        absolute_byte_offset: line.offset,
                        bytes,
                        spans: &spans,
                    })?
                } else {
                    sink.context(&SinkContext {
                        line_number: line.number,
                        absolute_byte_offset: line.offset,
                        bytes,
                        spans: &spans,
                        kind: SinkContextKind::After,
                    })?
                };
                last_emitted = Some(line.number);
                after_left -= 1;
                if !keepgoing {
                    break;
                }
                continue;
            }

            if is_match {
                let first_emitted = before
                    .front()
                    .map(|pending| pending.number)
                    .unwrap_or(line.number);
                if any_context
                    && last_emitted
                        .map_or(false, |last| first_emitted > last + 1)
                {
                    if !sink.context_break()? {
                        break;
                    }
                }
                let mut keepgoing = true;
                for pending in before.drain(..) {
                    let spans = matcher.find_iter(&pending.bytes);
                    keepgoing = sink.context(&SinkContext {
                        line_number: pending.number,
                        absolute_byte_offset: pending.offset,
                        bytes: &pending.bytes,
                        spans: &spans,
                        kind: SinkContextKind::Before,
                    })?;
                    last_emitted = Some(pending.number);
                    if !keepgoing {
                        break;
                    }
                }
                if !keepgoing {
                    break;
                }
                let spans = matcher.find_iter(bytes);
                let keepgoing = sink.matched(&SinkMatch {
                    line_number: line.number,
                    absolute_byte_offset: line.offset,
                    bytes,
                    spans: &spans,
                })?;
                last_emitted = Some(line.number);
                selected += 1;
                after_left = config.after_context;
                if !keepgoing {
                    break;
                }
            } else if after_left > 0 {
                let spans = matcher.find_iter(bytes);
                let keepgoing = sink.context(&SinkContext {
                    line_number: line.number,
                    absolute_byte_offset: line.offset,
                    bytes,
                    spans: &spans,
                    kind: SinkContextKind::After,
                })?;
                last_emitted = Some(line.number);
                after_left -= 1;
                if !keepgoing {
                    break;
                }
            } else if config.before_context > 0 {
                if before.len() == config.before_context {
                    before.pop_front();
                }
                before.push_back(PendingLine {
                    number: line.number,
                    offset: line.offset,
                    bytes: bytes.to_vec(),
                });
            }
        }
        sink.finish(&SinkFinish { byte_count: reader.byte_count(), selected })
    }
}

impl Default for Searcher {
    fn default() -> Searcher {
        Searcher::new()
    }
}

#[cfg(test)]
mod tests {
    use grab_matcher::{PatternMatcher, PatternMatcherBuilder, Syntax};

    use super::*;

    /// Sink для тестов, рендерящий события в простой текстовый протокол.
    #[derive(Debug, Default)]
    struct KitchenSink {
        output: String,
        finish: Option<SinkFinish>,
        stop_after: Option<usize>,
        matches_seen: usize,
    }

    impl KitchenSink {
        fn stop_after(n: usize) -> KitchenSink {
            KitchenSink { stop_after: Some(n), ..KitchenSink::default() }
        }
    }

    impl Sink for KitchenSink {
        type Error = std::io::Error;

        fn matched(
            &mut self,
            mat: &SinkMatch<'_>,
        ) -> Result<bool, Self::Error> {
            self.output.push_str(&format!(
                "{}:{}:{}\n",
                mat.line_number,
                mat.absolute_byte_offset,
                String::from_utf8_lossy(mat.bytes),
            ));
            self.matches_seen += 1;
            Ok(self.stop_after.map_or(true, |n| self.matches_seen < n))
        }

        fn context(
            &mut self,
            ctx: &SinkContext<'_>,
        ) -> Result<bool, Self::Error> {
            self.output.push_str(&format!(
                "{}-{}-{}\n",
                ctx.line_number,
                ctx.absolute_byte_offset,
                String::from_utf8_lossy(ctx.bytes),
            ));
            Ok(true)
        }

        fn context_break(&mut self) -> Result<bool, Self::Error> {
            self.output.push_str("--\n");
            Ok(true)
        }

        fn finish(&mut self, finish: &SinkFinish) -> Result<(), Self::Error> {
            self.finish = Some(finish.clone());
            Ok(())
        }
    }

    fn matcher(pattern: &str) -> PatternMatcher {
        PatternMatcherBuilder::new()
            .syntax(Syntax::Extended)
            .build(&[pattern.to_string()])
            .unwrap()
    }

    fn search(
        builder: &SearcherBuilder,
        pattern: &str,
        haystack: &str,
    ) -> KitchenSink {
        let mut sink = KitchenSink::default();
        builder
            .build()
            .search_slice(&matcher(pattern), haystack.as_bytes(), &mut sink)
            .unwrap();
        sink
    }

    const NUMBERED: &str = "L1\nL2\nL3\nL4\nL5\nL6\nL7\n";

    #[test]
    fn basic_match() {
        let sink =
            search(&SearcherBuilder::new(), "et", "alpha\nbeta\ngamma\n");
        assert_eq!(sink.output, "2:6:beta\n");
        assert_eq!(sink.finish.unwrap().selected, 1);
    }

    #[test]
    fn before_and_after_context() {
        let mut builder = SearcherBuilder::new();
        builder.before_context(1).after_context(1);
        let sink = search(&builder, "L4", NUMBERED);
        assert_eq!(sink.output, "3-6-L3\n4:9:L4\n5-12-L5\n");
    }

    #[test]
    fn context_groups_are_separated() {
        let mut builder = SearcherBuilder::new();
        builder.before_context(1).after_context(1);
        let sink = search(&builder, "L2|L6", NUMBERED);
        assert_eq!(
            sink.output,
            "1-0-L1\n2:3:L2\n3-6-L3\n--\n5-12-L5\n6:15:L6\n7-18-L7\n"
        );
    }

    #[test]
    fn adjacent_windows_are_not_separated() {
        let mut builder = SearcherBuilder::new();
        builder.before_context(1).after_context(1);
        let sink = search(&builder, "L2|L4", NUMBERED);
        assert_eq!(
            sink.output,
            "1-0-L1\n2:3:L2\n3-6-L3\n4:9:L4\n5-12-L5\n"
        );
    }

    #[test]
    fn separator_appears_with_only_before_context() {
        let mut builder = SearcherBuilder::new();
        builder.before_context(1);
        let sink = search(&builder, "L2|L6", NUMBERED);
        assert_eq!(sink.output, "1-0-L1\n2:3:L2\n--\n5-12-L5\n6:15:L6\n");
    }

    #[test]
    fn no_separator_without_context() {
        let sink = search(&SearcherBuilder::new(), "L2|L6", NUMBERED);
        assert_eq!(sink.output, "2:3:L2\n6:15:L6\n");
    }

    #[test]
    fn max_count_flushes_open_after_window() {
        let mut builder = SearcherBuilder::new();
        builder.max_count(Some(1)).after_context(2);
        let haystack = "L1\nhit2\nL3\nL4\nhit5\nL6\nL7\nL8\nL9\nL10\n";
        let sink = search(&builder, "hit", haystack);
        assert_eq!(sink.output, "2:3:hit2\n3-8-L3\n4-11-L4\n");
        assert_eq!(sink.finish.unwrap().selected, 1);
    }

    #[test]
    fn max_count_zero_selects_nothing() {
        let mut builder = SearcherBuilder::new();
        builder.max_count(Some(0));
        let sink = search(&builder, "L", NUMBERED);
        assert_eq!(sink.output, "");
        assert_eq!(sink.finish.unwrap().selected, 0);
    }

    #[test]
    fn invert_match_selects_complement() {
        let mut builder = SearcherBuilder::new();
        builder.invert_match(true);
        let sink = search(&builder, "et", "alpha\nbeta\ngamma\n");
        assert_eq!(sink.output, "1:0:alpha\n3:11:gamma\n");
        assert_eq!(sink.finish.unwrap().selected, 2);
    }

    #[test]
    fn invert_duality_covers_all_lines() {
        let straight = search(&SearcherBuilder::new(), "a", NUMBERED);
        let mut builder = SearcherBuilder::new();
        builder.invert_match(true);
        let inverted = search(&builder, "a", NUMBERED);
        let total = straight.finish.unwrap().selected
            + inverted.finish.unwrap().selected;
        assert_eq!(total, 7);
    }

    #[test]
    fn nul_line_terminator() {
        let mut builder = SearcherBuilder::new();
        builder.line_terminator(b'\x00');
        let mut sink = KitchenSink::default();
        builder
            .build()
            .search_slice(&matcher("et"), b"alpha\x00beta\x00", &mut sink)
            .unwrap();
        assert_eq!(sink.output, "2:6:beta\n");
    }

    #[test]
    fn strip_cr_hides_carriage_return() {
        let mut builder = SearcherBuilder::new();
        builder.strip_cr(true);
        let sink = search(&builder, "beta$", "alpha\r\nbeta\r\ngamma\r\n");
        // Смещение относится к немодифицированному источнику.
        assert_eq!(sink.output, "2:7:beta\n");
    }

    #[test]
    fn without_strip_cr_the_cr_stays() {
        let sink = search(
            &SearcherBuilder::new(),
            "beta",
            "alpha\r\nbeta\r\ngamma\r\n",
        );
        assert_eq!(sink.output, "2:7:beta\r\n");
    }

    #[test]
    fn trailing_line_without_terminator() {
        let sink = search(&SearcherBuilder::new(), "gam", "alpha\nbeta\ngam");
        assert_eq!(sink.output, "3:11:gam\n");
        assert_eq!(sink.finish.as_ref().unwrap().byte_count, 14);
    }

    #[test]
    fn sink_can_stop_the_search() {
        let mut sink = KitchenSink::stop_after(1);
        SearcherBuilder::new()
            .build()
            .search_slice(
                &matcher("L"),
                NUMBERED.as_bytes(),
                &mut sink,
            )
            .unwrap();
        assert_eq!(sink.output, "1:0:L1\n");
        // finish всё равно вызывается.
        assert!(sink.finish.is_some());
    }

    #[test]
    fn selected_counts_respect_max_count() {
        let mut builder = SearcherBuilder::new();
        builder.max_count(Some(3));
        let sink = search(&builder, "L", NUMBERED);
        assert_eq!(sink.finish.unwrap().selected, 3);
    }
}
