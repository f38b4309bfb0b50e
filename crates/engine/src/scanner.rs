use std::{
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use grab_printer::{
    Standard, StandardBuilder, Summary, SummaryBuilder, SummaryKind,
};
use grab_searcher::{
    is_binary_prefix, Searcher, SearcherBuilder, Sink, SinkContext,
    SinkContextKind, SinkFinish, SinkMatch,
};
use grab_walk::WalkEvent;

use crate::{
    BinaryMode, Config, ErrorNote, FileSummary, Grep, LineRecord, Outcome,
    OutputMode, RecordKind,
};

/// Путь, обозначающий поток по умолчанию в списке путей.
pub const STDIN_PATH: &str = "-";

/// Сколько байтов префикса прочитать для определения двоичности.
const BINARY_SNIFF_LEN: usize = 8 * (1 << 10);

/// Активный приёмник вывода одного выполнения.
enum Output<W: Write> {
    Standard(Standard<W>),
    Summary(Summary<W>),
    Quiet(W),
}

impl<W: Write> Output<W> {
    /// Написать информационную заметку в приёмник вывода. Заметки
    /// печатаются только в классическом построчном режиме.
    fn write_note(&mut self, note: &str) -> io::Result<()> {
        if let Output::Standard(ref mut printer) = *self {
            let wtr = printer.get_mut();
            wtr.write_all(note.as_bytes())?;
            wtr.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Output::Standard(ref mut printer) => printer.get_mut().flush(),
            Output::Summary(ref mut printer) => printer.get_mut().flush(),
            Output::Quiet(ref mut wtr) => wtr.flush(),
        }
    }
}

/// Выполнить один поиск целиком: обход, сканирование, агрегация.
pub(crate) fn run<W: Write>(
    grep: &Grep,
    wtr: W,
    capture: bool,
) -> io::Result<Outcome> {
    let config = &grep.config;
    let colors = grep.colors(capture);
    let out = if config.quiet {
        Output::Quiet(wtr)
    } else {
        match config.output_mode {
            OutputMode::Standard => {
                Output::Standard(standard_printer(config, colors, wtr))
            }
            OutputMode::FilesWithMatches => Output::Summary(
                summary_printer(config, colors, SummaryKind::PathWithMatch)
                    .build(wtr),
            ),
            OutputMode::FilesWithoutMatch => Output::Summary(
                summary_printer(config, colors, SummaryKind::PathWithoutMatch)
                    .build(wtr),
            ),
            OutputMode::Count => Output::Summary(
                summary_printer(config, colors, SummaryKind::Count)
                    .build(wtr),
            ),
        }
    };
    let mut scan = Scan {
        grep,
        config,
        searcher: build_searcher(config),
        out,
        capture,
        outcome: Outcome::default(),
        done: false,
        io_error: None,
    };

    let walker = grep.walker.clone();
    match effective_paths(config) {
        None => scan.scan_stdin(),
        Some(paths) => {
            for path in paths {
                if scan.done {
                    break;
                }
                if path.as_os_str() == STDIN_PATH {
                    scan.scan_stdin();
                } else {
                    walker.walk(std::slice::from_ref(&path), |event| {
                        scan.handle_event(event)
                    });
                }
            }
        }
    }
    scan.out.flush()?;
    if let Some(err) = scan.io_error {
        return Err(err);
    }
    Ok(scan.outcome)
}

/// Пути этого выполнения: `None` означает поток по умолчанию.
fn effective_paths(config: &Config) -> Option<Vec<PathBuf>> {
    if !config.paths.is_empty() {
        return Some(config.paths.clone());
    }
    if config.dir_action.is_recursive() {
        Some(vec![PathBuf::from(".")])
    } else {
        None
    }
}

fn build_searcher(config: &Config) -> Searcher {
    let (before, after) = if config.only_matching {
        (0, 0)
    } else {
        (config.before_context, config.after_context)
    };
    SearcherBuilder::new()
        .line_terminator(config.line_term)
        .invert_match(config.invert_match)
        .before_context(before)
        .after_context(after)
        .max_count(config.max_count)
        .strip_cr(config.strip_cr)
        .build()
}

fn standard_printer<W: Write>(
    config: &Config,
    colors: Option<grab_printer::Palette>,
    wtr: W,
) -> Standard<W> {
    let separators = &config.separators;
    StandardBuilder::new()
        .line_number(config.line_number)
        .byte_offset(config.byte_offset)
        .only_matching(config.only_matching)
        .line_buffered(config.line_buffered)
        .invert_match(config.invert_match)
        .line_terminator(config.line_term)
        .colors(colors)
        .initial_tab(config.initial_tab)
        .null_after_result(config.null_after_result)
        .separator_result(separators.result.clone())
        .separator_name_num(separators.name_num.clone())
        .separator_name_byte(separators.name_byte.clone())
        .separator_context_group(separators.context_group.clone())
        .separator_context_result(separators.context_result.clone())
        .separator_context_name_num(separators.context_name_num.clone())
        .separator_context_name_byte(separators.context_name_byte.clone())
        .build(wtr)
}

fn summary_printer(
    config: &Config,
    colors: Option<grab_printer::Palette>,
    kind: SummaryKind,
) -> SummaryBuilder {
    let mut builder = SummaryBuilder::new(kind);
    builder
        // Сводные режимы всегда включают имя файла.
        .with_filename(true)
        .line_buffered(config.line_buffered)
        .line_terminator(config.line_term)
        .colors(colors)
        .separator_result(config.separators.result.clone());
    builder
}

/// Состояние одного выполнения.
struct Scan<'g, W: Write> {
    grep: &'g Grep,
    config: &'g Config,
    searcher: Searcher,
    out: Output<W>,
    capture: bool,
    outcome: Outcome,
    done: bool,
    io_error: Option<io::Error>,
}

impl<'g, W: Write> Scan<'g, W> {
    fn handle_event(&mut self, event: WalkEvent) {
        if self.done {
            return;
        }
        match event {
            WalkEvent::File(path) => self.scan_file(&path),
            WalkEvent::Info(note) => self.info(note),
            WalkEvent::Error(path, message) => {
                self.error(path.display().to_string(), message)
            }
        }
    }

    fn info(&mut self, note: String) {
        if !self.capture && !self.config.quiet {
            if let Err(err) = self.out.write_note(&note) {
                self.write_error(err);
                return;
            }
        }
        self.outcome.infos.push(note);
    }

    fn error(&mut self, path: String, message: String) {
        if !self.config.no_messages {
            eprintln!("grab: {}: {}", path, message);
        }
        self.outcome.errors.push(ErrorNote { path, message });
    }

    /// Ошибка записи в приёмник вывода. Разрыв канала — грациозное
    /// завершение; всё остальное останавливает выполнение с ошибкой.
    fn write_error(&mut self, err: io::Error) {
        if err.kind() == io::ErrorKind::BrokenPipe {
            self.done = true;
        } else if self.io_error.is_none() {
            self.io_error = Some(err);
            self.done = true;
        }
    }

    fn scan_file(&mut self, path: &Path) {
        let name = path.display().to_string();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                self.error(name, err.to_string());
                return;
            }
        };
        self.scan_source(name, file);
    }

    fn scan_stdin(&mut self) {
        let label = self.config.label.clone();
        let stdin = io::stdin();
        let lock = stdin.lock();
        self.scan_source(label, lock);
    }

    fn scan_source<R: Read>(&mut self, name: String, mut rdr: R) {
        // Ограниченный префикс для классификации источника; затем префикс
        // пришивается обратно, чтобы поток читался ровно один раз.
        let mut prefix = vec![0u8; BINARY_SNIFF_LEN];
        let mut filled = 0;
        loop {
            match rdr.read(&mut prefix[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    if filled == prefix.len() {
                        break;
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => {
                    self.error(name, err.to_string());
                    return;
                }
            }
        }
        prefix.truncate(filled);
        let binary = self.config.binary_mode != BinaryMode::Text
            && is_binary_prefix(&prefix, self.config.line_term);
        if binary && self.config.binary_mode == BinaryMode::WithoutMatch {
            log::debug!("{}: двоичный источник пропущен", name);
            return;
        }
        let rdr = io::Cursor::new(prefix).chain(rdr);

        let counting_only = self.config.quiet
            || self.config.output_mode != OutputMode::Standard
            || binary;
        if counting_only {
            self.scan_counting(name, rdr, binary);
        } else if self.capture {
            self.scan_capturing(name, rdr);
        } else {
            self.scan_printing(name, rdr);
        }
    }

    /// Сканирование без построчного вывода: тихий режим, сводные режимы и
    /// подавленный вывод двоичных источников.
    fn scan_counting<R: Read>(&mut self, name: String, rdr: R, binary: bool) {
        let stop_on_first = self.config.quiet
            || matches!(
                self.config.output_mode,
                OutputMode::FilesWithMatches | OutputMode::FilesWithoutMatch
            );
        let mut sink = CountingSink { stop_on_first, ..CountingSink::default() };
        if let Err(err) =
            self.searcher.search_reader(&self.grep.matcher, rdr, &mut sink)
        {
            self.error(name, err.to_string());
            return;
        }
        let (matched, selected) = (sink.has_match, sink.selected);

        if binary && matched && self.config.output_mode == OutputMode::Standard
        {
            let note = format!("{}: binary file matches", name);
            self.info(note);
        }
        if !self.config.quiet {
            if let Output::Summary(ref mut printer) = self.out {
                if let Err(err) = printer.report(&name, matched, selected) {
                    self.write_error(err);
                }
            }
        }
        self.outcome.summaries.push(FileSummary {
            path: name,
            matched,
            selected,
            records: None,
        });
        if self.config.quiet && matched {
            // Тихий режим: первая выбранная строка завершает выполнение.
            self.done = true;
        }
    }

    /// Сканирование с печатью через классический принтер.
    fn scan_printing<R: Read>(&mut self, name: String, rdr: R) {
        let Output::Standard(ref mut printer) = self.out else {
            unreachable!("классический режим без классического принтера")
        };
        let path = self.config.with_filename.then_some(name.as_str());
        let mut sink = printer.sink_with_path(path);
        let result =
            self.searcher.search_reader(&self.grep.matcher, rdr, &mut sink);
        let (matched, selected) = (sink.has_match(), sink.selected());
        if let Err(err) = result {
            // Ошибку записи не отличить здесь от ошибки чтения, но разрыв
            // канала всегда означает остановку без сообщения.
            if err.kind() == io::ErrorKind::BrokenPipe {
                self.done = true;
            } else {
                self.error(name.clone(), err.to_string());
            }
        }
        self.outcome.summaries.push(FileSummary {
            path: name,
            matched,
            selected,
            records: None,
        });
    }

    /// Сканирование с захватом записей в набор результатов.
    fn scan_capturing<R: Read>(&mut self, name: String, rdr: R) {
        let start = self.outcome.records.len();
        let mut sink = CaptureSink {
            path: name.clone(),
            records: &mut self.outcome.records,
            selected: 0,
            has_match: false,
        };
        let result =
            self.searcher.search_reader(&self.grep.matcher, rdr, &mut sink);
        let (matched, selected) = (sink.has_match, sink.selected);
        if let Err(err) = result {
            self.error(name.clone(), err.to_string());
        }
        let end = self.outcome.records.len();
        let records = if end > start { Some((start, end - 1)) } else { None };
        self.outcome.summaries.push(FileSummary {
            path: name,
            matched,
            selected,
            records,
        });
    }
}

/// Sink, который только считает.
#[derive(Debug, Default)]
struct CountingSink {
    stop_on_first: bool,
    selected: u64,
    has_match: bool,
}

impl Sink for CountingSink {
    type Error = io::Error;

    fn matched(&mut self, _mat: &SinkMatch<'_>) -> Result<bool, io::Error> {
        self.has_match = true;
        Ok(!self.stop_on_first)
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), io::Error> {
        self.selected = finish.selected;
        Ok(())
    }
}

/// Sink, складывающий записи в список захвата.
#[derive(Debug)]
struct CaptureSink<'a> {
    path: String,
    records: &'a mut Vec<LineRecord>,
    selected: u64,
    has_match: bool,
}

impl<'a> Sink for CaptureSink<'a> {
    type Error = io::Error;

    fn matched(&mut self, mat: &SinkMatch<'_>) -> Result<bool, io::Error> {
        self.has_match = true;
        self.records.push(LineRecord {
            path: self.path.clone(),
            line_number: mat.line_number,
            byte_offset: mat.absolute_byte_offset,
            bytes: mat.bytes.to_vec(),
            spans: mat.spans.to_vec(),
            kind: RecordKind::Match,
        });
        Ok(true)
    }

    fn context(&mut self, ctx: &SinkContext<'_>) -> Result<bool, io::Error> {
        let kind = match ctx.kind {
            SinkContextKind::Before => RecordKind::BeforeContext,
            SinkContextKind::After => RecordKind::AfterContext,
        };
        self.records.push(LineRecord {
            path: self.path.clone(),
            line_number: ctx.line_number,
            byte_offset: ctx.absolute_byte_offset,
            bytes: ctx.bytes.to_vec(),
            spans: ctx.spans.to_vec(),
            kind,
        });
        Ok(true)
    }

    fn context_break(&mut self) -> Result<bool, io::Error> {
        self.records.push(LineRecord {
            path: self.path.clone(),
            line_number: 0,
            byte_offset: 0,
            bytes: vec![],
            spans: vec![],
            kind: RecordKind::GroupSeparator,
        });
        Ok(true)
    }

    fn finish(&mut self, finish: &SinkFinish) -> Result<(), io::Error> {
        self.selected = finish.selected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use grab_matcher::Syntax;
    use grab_walk::DirAction;

    use crate::{
        BinaryMode, GrepBuilder, OutputMode, RecordKind,
    };

    /// Мы используем это вместо tempfile, потому что tempfile тянет
    /// слишком много зависимостей.
    struct TempDir(PathBuf);

    impl Drop for TempDir {
        fn drop(&mut self) {
            fs::remove_dir_all(&self.0).unwrap();
        }
    }

    impl TempDir {
        fn new() -> TempDir {
            use std::sync::atomic::{AtomicUsize, Ordering};

            static TRIES: usize = 100;
            static COUNTER: AtomicUsize = AtomicUsize::new(0);

            let tmpdir = std::env::temp_dir();
            for _ in 0..TRIES {
                let count = COUNTER.fetch_add(1, Ordering::SeqCst);
                let path = tmpdir.join("rust-grab-engine").join(format!(
                    "{}-{}",
                    std::process::id(),
                    count
                ));
                if path.is_dir() {
                    continue;
                }
                fs::create_dir_all(&path).unwrap();
                return TempDir(path);
            }
            panic!("failed to create temp dir after {} tries", TRIES);
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn output(grep: &crate::Grep) -> String {
        let mut buf = vec![];
        grep.execute_to(&mut buf, false).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn basic_match_single_file() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "a.txt", b"alpha\nbeta\ngamma\n");
        let grep = GrepBuilder::new()
            .pattern("et")
            .path(&path)
            .build()
            .unwrap();
        assert_eq!(output(&grep), "beta\n");
    }

    #[test]
    fn line_numbers_and_filename() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "a.txt", b"alpha\nbeta\ngamma\n");
        let grep = GrepBuilder::new()
            .pattern("et")
            .path(&path)
            .with_filename(true)
            .line_number(true)
            .build()
            .unwrap();
        assert_eq!(output(&grep), format!("{}:2:beta\n", path.display()));
    }

    #[test]
    fn context_window() {
        let tmp = TempDir::new();
        let path =
            write_file(&tmp, "a.txt", b"L1\nL2\nL3\nL4\nL5\nL6\nL7\n");
        let grep = GrepBuilder::new()
            .pattern("L4")
            .path(&path)
            .line_number(true)
            .before_context(1)
            .after_context(1)
            .build()
            .unwrap();
        assert_eq!(output(&grep), "3-L3\n4:L4\n5-L5\n");
    }

    #[test]
    fn max_count_with_after_context() {
        let tmp = TempDir::new();
        let mut contents = String::new();
        for i in 1..=10 {
            if i == 2 || i == 5 {
                contents.push_str(&format!("hit{}\n", i));
            } else {
                contents.push_str(&format!("L{}\n", i));
            }
        }
        let path = write_file(&tmp, "a.txt", contents.as_bytes());
        let grep = GrepBuilder::new()
            .pattern("hit")
            .path(&path)
            .max_count(Some(1))
            .after_context(2)
            .build()
            .unwrap();
        let got = output(&grep);
        assert_eq!(got, "hit2\nL3\nL4\n");
        assert!(!got.contains("hit5"));
    }

    #[test]
    fn binary_default_policy() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "bin", b"hi\x00\nfoo\nhi\n");
        let grep = GrepBuilder::new()
            .pattern("hi")
            .syntax(Syntax::Fixed)
            .path(&path)
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        assert_eq!(outcome.records.len(), 0);
        assert_eq!(
            outcome.infos,
            vec![format!("{}: binary file matches", path.display())]
        );
        assert!(outcome.has_match());
        assert_eq!(outcome.summaries[0].selected, 2);
    }

    #[test]
    fn binary_text_policy_prints_lines() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "bin", b"hi\x00x\nfoo\nhi\n");
        let grep = GrepBuilder::new()
            .pattern("hi")
            .syntax(Syntax::Fixed)
            .path(&path)
            .binary_mode(BinaryMode::Text)
            .build()
            .unwrap();
        assert_eq!(output(&grep), "hi\x00x\nhi\n");
    }

    #[test]
    fn binary_without_match_policy_skips() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "bin", b"hi\x00\nhi\n");
        let grep = GrepBuilder::new()
            .pattern("hi")
            .syntax(Syntax::Fixed)
            .path(&path)
            .binary_mode(BinaryMode::WithoutMatch)
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        assert!(outcome.summaries.is_empty());
        assert!(outcome.infos.is_empty());
        assert!(!outcome.has_match());
    }

    #[test]
    fn recursive_with_include_and_exclude_dir() {
        let tmp = TempDir::new();
        write_file(&tmp, "a.log", b"hit\n");
        write_file(&tmp, "b.tmp", b"hit\n");
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("c.log"), b"hit\n").unwrap();
        let grep = GrepBuilder::new()
            .pattern("hit")
            .path(tmp.path())
            .directories(DirAction::Recurse)
            .with_filename(true)
            .include("*.log")
            .exclude_dir("sub")
            .build()
            .unwrap();
        let got = output(&grep);
        assert_eq!(
            got,
            format!("{}:hit\n", tmp.path().join("a.log").display())
        );
    }

    #[test]
    fn directory_read_policy_notes() {
        let tmp = TempDir::new();
        let grep = GrepBuilder::new()
            .pattern("x")
            .path(tmp.path())
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        assert_eq!(outcome.infos.len(), 1);
        assert!(outcome.infos[0].ends_with(": Is a directory"));
        assert!(!outcome.has_match());
    }

    #[test]
    fn missing_file_records_error() {
        let tmp = TempDir::new();
        let grep = GrepBuilder::new()
            .pattern("x")
            .path(tmp.path().join("absent"))
            .no_messages(true)
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        assert!(outcome.has_errors());
        assert!(!outcome.has_match());
    }

    #[test]
    fn capture_records_and_ranges() {
        let tmp = TempDir::new();
        let a = write_file(&tmp, "a.txt", b"alpha\nbeta\n");
        let b = write_file(&tmp, "b.txt", b"beta\nbeta\n");
        let grep = GrepBuilder::new()
            .pattern("beta")
            .syntax(Syntax::Fixed)
            .paths([&a, &b])
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.summaries[0].records, Some((0, 0)));
        assert_eq!(outcome.summaries[1].records, Some((1, 2)));
        assert_eq!(outcome.records[0].kind, RecordKind::Match);
        assert_eq!(outcome.records[0].bytes, b"beta");
        assert_eq!(outcome.records[0].line_number, 2);
        assert_eq!(outcome.records[0].byte_offset, 6);
        assert_eq!(outcome.records[0].spans, vec![
            grab_matcher::Span::new(0, 4)
        ]);
    }

    #[test]
    fn capture_group_separator_records() {
        let tmp = TempDir::new();
        let path =
            write_file(&tmp, "a.txt", b"L1\nL2\nL3\nL4\nL5\nL6\nL7\n");
        let grep = GrepBuilder::new()
            .patterns(["L2", "L6"])
            .path(&path)
            .syntax(Syntax::Fixed)
            .before_context(1)
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        let kinds: Vec<_> =
            outcome.records.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecordKind::GroupSeparator));
    }

    #[test]
    fn files_with_matches_mode() {
        let tmp = TempDir::new();
        let a = write_file(&tmp, "a.txt", b"beta\n");
        let b = write_file(&tmp, "b.txt", b"nope\n");
        let grep = GrepBuilder::new()
            .pattern("beta")
            .paths([&a, &b])
            .output_mode(OutputMode::FilesWithMatches)
            .build()
            .unwrap();
        assert_eq!(output(&grep), format!("{}\n", a.display()));
    }

    #[test]
    fn files_without_match_mode() {
        let tmp = TempDir::new();
        let a = write_file(&tmp, "a.txt", b"beta\n");
        let b = write_file(&tmp, "b.txt", b"nope\n");
        let grep = GrepBuilder::new()
            .pattern("beta")
            .paths([&a, &b])
            .output_mode(OutputMode::FilesWithoutMatch)
            .build()
            .unwrap();
        assert_eq!(output(&grep), format!("{}\n", b.display()));
    }

    #[test]
    fn count_mode() {
        let tmp = TempDir::new();
        let a = write_file(&tmp, "a.txt", b"beta\nbeta\nnope\n");
        let grep = GrepBuilder::new()
            .pattern("beta")
            .path(&a)
            .output_mode(OutputMode::Count)
            .build()
            .unwrap();
        assert_eq!(output(&grep), format!("{}:2\n", a.display()));
    }

    #[test]
    fn quiet_mode_suppresses_output_and_stops() {
        let tmp = TempDir::new();
        let a = write_file(&tmp, "a.txt", b"beta\n");
        let b = write_file(&tmp, "b.txt", b"beta\n");
        let grep = GrepBuilder::new()
            .pattern("beta")
            .paths([&a, &b])
            .quiet(true)
            .build()
            .unwrap();
        let mut buf = vec![];
        let outcome = grep.execute_to(&mut buf, false).unwrap();
        assert!(buf.is_empty());
        assert!(outcome.has_match());
        // Второй файл не сканировался.
        assert_eq!(outcome.summaries.len(), 1);
    }

    #[test]
    fn idempotent_runs() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "a.txt", b"alpha\nbeta\ngamma\n");
        let grep = GrepBuilder::new()
            .pattern("a")
            .path(&path)
            .line_number(true)
            .build()
            .unwrap();
        assert_eq!(output(&grep), output(&grep));
    }

    #[test]
    fn no_patterns_is_fatal() {
        let err = GrepBuilder::new().build().unwrap_err();
        assert!(matches!(err, crate::Error::NoPatterns));
    }

    #[test]
    fn no_inputs_without_default_stream_is_fatal() {
        let err = GrepBuilder::new()
            .pattern("x")
            .default_stream(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::NoInputs));
    }

    #[test]
    fn invalid_pattern_is_fatal() {
        let err = GrepBuilder::new()
            .pattern("a(")
            .syntax(Syntax::Extended)
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::Pattern(_)));
    }

    #[test]
    fn only_matching_disables_context() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "a.txt", b"x1\nmatch\nx2\n");
        let grep = GrepBuilder::new()
            .pattern("match")
            .path(&path)
            .only_matching(true)
            .before_context(2)
            .after_context(2)
            .build()
            .unwrap();
        assert_eq!(output(&grep), "match\n");
    }

    #[test]
    fn null_data_mode() {
        let tmp = TempDir::new();
        let path = write_file(&tmp, "a.bin", b"alpha\x00beta\x00");
        let grep = GrepBuilder::new()
            .pattern("et")
            .path(&path)
            .line_terminator(b'\x00')
            .build()
            .unwrap();
        let mut buf = vec![];
        grep.execute_to(&mut buf, false).unwrap();
        assert_eq!(buf, b"beta\x00");
    }

    #[test]
    fn offsets_are_consistent_with_source() {
        let tmp = TempDir::new();
        let contents = b"one\ntwo\nthree\nfour\n";
        let path = write_file(&tmp, "a.txt", contents);
        let grep = GrepBuilder::new()
            .pattern("o")
            .path(&path)
            .build()
            .unwrap();
        let outcome = grep.execute(true).unwrap();
        for record in &outcome.records {
            let off = record.byte_offset as usize;
            assert_eq!(
                &contents[off..off + record.bytes.len()],
                record.bytes.as_slice()
            );
            let newlines = contents[..off]
                .iter()
                .filter(|&&b| b == b'\n')
                .count() as u64;
            assert_eq!(record.line_number, newlines + 1);
        }
    }
}
